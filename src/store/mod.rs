//! Storage abstractions for the exchange

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use models::*;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::ExchangeError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ExchangeError>;

/// Trait for user accounts, remember-me tokens, and reset tokens
pub trait UserStore: Send + Sync {
    /// Create a new unverified user. Fails with `EmailTaken` on a duplicate
    /// email address.
    fn create_user(&self, user: NewUser) -> StoreResult<UserId>;

    /// Get a user by ID
    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>>;

    /// Get a user by email address (case-insensitive)
    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Mark an email address as verified and clear its verification token
    fn verify_email(&self, email: &str) -> StoreResult<()>;

    /// Bump the last-login timestamp
    fn update_last_login(&self, user_id: UserId) -> StoreResult<()>;

    /// Replace a user's password hash
    fn update_password(&self, user_id: UserId, password_hash: &str) -> StoreResult<()>;

    /// Update editable profile fields
    fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> StoreResult<()>;

    /// List users, newest first
    fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>>;

    /// Total registered users
    fn count_users(&self) -> StoreResult<i64>;

    /// Delete a user; books, wishlist rows, sessions, and tokens go with it
    fn delete_user(&self, user_id: UserId) -> StoreResult<()>;

    /// Store a password reset token with its expiry
    fn set_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Look up the user holding a reset token
    fn get_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>>;

    /// Clear a user's reset token (tokens are single-use)
    fn clear_reset_token(&self, user_id: UserId) -> StoreResult<()>;

    /// Create or replace the user's remember-me token (one row per user)
    fn upsert_remember_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Look up a remember-me token
    fn get_remember_token(&self, token: &str) -> StoreResult<Option<RememberToken>>;

    /// Push a remember-me token's expiry forward
    fn extend_remember_token(&self, token: &str, expires_at: DateTime<Utc>) -> StoreResult<()>;

    /// Delete a remember-me token
    fn delete_remember_token(&self, token: &str) -> StoreResult<()>;
}

/// Trait for server-side sessions and their one-shot flash slot
pub trait SessionStore: Send + Sync {
    /// Create a session; anonymous when `user_id` is None
    fn create_session(&self, user_id: Option<UserId>) -> StoreResult<Session>;

    /// Get a session by ID
    fn get_session(&self, session_id: &SessionId) -> StoreResult<Option<Session>>;

    /// Delete a session
    fn delete_session(&self, session_id: &SessionId) -> StoreResult<()>;

    /// Set the session's flash message, replacing any unconsumed one
    fn set_flash(&self, session_id: &SessionId, flash: &Flash) -> StoreResult<()>;

    /// Take and clear the session's flash message
    fn take_flash(&self, session_id: &SessionId) -> StoreResult<Option<Flash>>;
}

/// Trait for the book catalog
pub trait BookStore: Send + Sync {
    /// Create a listing owned by `owner`; status starts `available`
    fn create_book(&self, owner: UserId, draft: &BookDraft) -> StoreResult<BookId>;

    /// Get a book with its owner's public profile fields
    fn get_book(&self, book_id: BookId) -> StoreResult<Option<BookWithOwner>>;

    /// Replace a listing's editable fields
    fn update_book(&self, book_id: BookId, draft: &BookDraft) -> StoreResult<()>;

    /// Delete a listing
    fn delete_book(&self, book_id: BookId) -> StoreResult<()>;

    /// Change a listing's status
    fn set_book_status(&self, book_id: BookId, status: BookStatus) -> StoreResult<()>;

    /// Filtered, sorted, paginated catalog slice
    fn list_books(
        &self,
        filters: &BookFilters,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<BookWithOwner>>;

    /// Count over the same predicate set as [`BookStore::list_books`]
    fn count_books(&self, filters: &BookFilters) -> StoreResult<i64>;

    /// All of one user's books, any status, newest first
    fn books_by_user(&self, user_id: UserId) -> StoreResult<Vec<Book>>;

    /// Distinct genres among available books, sorted
    fn genres(&self) -> StoreResult<Vec<String>>;

    /// Aggregate catalog numbers for the admin dashboard
    fn statistics(&self) -> StoreResult<BookStatistics>;
}

/// Trait for the user-book wishlist relation
pub trait WishlistStore: Send + Sync {
    fn wishlist_has(&self, user_id: UserId, book_id: BookId) -> StoreResult<bool>;

    /// Insert the relation. Fails with `AlreadyInWishlist` when it exists,
    /// including when a concurrent insert wins the race.
    fn wishlist_add(&self, user_id: UserId, book_id: BookId) -> StoreResult<()>;

    /// Delete the relation; succeeds when it was already absent
    fn wishlist_remove(&self, user_id: UserId, book_id: BookId) -> StoreResult<()>;

    /// The user's wishlist joined with still-available books, newest first
    fn wishlist_for_user(&self, user_id: UserId) -> StoreResult<Vec<WishlistItem>>;

    /// Count of still-available wishlisted books
    fn wishlist_count(&self, user_id: UserId) -> StoreResult<i64>;
}

/// Trait for contact-form messages
pub trait ContactStore: Send + Sync {
    fn create_message(&self, message: &NewMessage) -> StoreResult<i64>;

    fn list_messages(
        &self,
        status: Option<MessageStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<ContactMessage>>;

    fn count_messages(&self, status: Option<MessageStatus>) -> StoreResult<i64>;

    fn set_message_status(&self, id: i64, status: MessageStatus) -> StoreResult<()>;

    fn delete_message(&self, id: i64) -> StoreResult<()>;
}

/// Everything the application state needs from one backing store.
pub trait Store:
    UserStore + SessionStore + BookStore + WishlistStore + ContactStore
{
}

impl<T> Store for T where
    T: UserStore + SessionStore + BookStore + WishlistStore + ContactStore
{
}

// Delegating impls so an Arc-shared store satisfies the traits; the test
// harness holds one side and the server the other.

impl<T: UserStore + ?Sized> UserStore for Arc<T> {
    fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        (**self).create_user(user)
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        (**self).get_user(user_id)
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        (**self).get_user_by_email(email)
    }

    fn verify_email(&self, email: &str) -> StoreResult<()> {
        (**self).verify_email(email)
    }

    fn update_last_login(&self, user_id: UserId) -> StoreResult<()> {
        (**self).update_last_login(user_id)
    }

    fn update_password(&self, user_id: UserId, password_hash: &str) -> StoreResult<()> {
        (**self).update_password(user_id, password_hash)
    }

    fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> StoreResult<()> {
        (**self).update_profile(user_id, update)
    }

    fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>> {
        (**self).list_users(limit, offset)
    }

    fn count_users(&self) -> StoreResult<i64> {
        (**self).count_users()
    }

    fn delete_user(&self, user_id: UserId) -> StoreResult<()> {
        (**self).delete_user(user_id)
    }

    fn set_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        (**self).set_reset_token(user_id, token, expires_at)
    }

    fn get_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>> {
        (**self).get_user_by_reset_token(token)
    }

    fn clear_reset_token(&self, user_id: UserId) -> StoreResult<()> {
        (**self).clear_reset_token(user_id)
    }

    fn upsert_remember_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        (**self).upsert_remember_token(user_id, token, expires_at)
    }

    fn get_remember_token(&self, token: &str) -> StoreResult<Option<RememberToken>> {
        (**self).get_remember_token(token)
    }

    fn extend_remember_token(&self, token: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        (**self).extend_remember_token(token, expires_at)
    }

    fn delete_remember_token(&self, token: &str) -> StoreResult<()> {
        (**self).delete_remember_token(token)
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn create_session(&self, user_id: Option<UserId>) -> StoreResult<Session> {
        (**self).create_session(user_id)
    }

    fn get_session(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        (**self).get_session(session_id)
    }

    fn delete_session(&self, session_id: &SessionId) -> StoreResult<()> {
        (**self).delete_session(session_id)
    }

    fn set_flash(&self, session_id: &SessionId, flash: &Flash) -> StoreResult<()> {
        (**self).set_flash(session_id, flash)
    }

    fn take_flash(&self, session_id: &SessionId) -> StoreResult<Option<Flash>> {
        (**self).take_flash(session_id)
    }
}

impl<T: BookStore + ?Sized> BookStore for Arc<T> {
    fn create_book(&self, owner: UserId, draft: &BookDraft) -> StoreResult<BookId> {
        (**self).create_book(owner, draft)
    }

    fn get_book(&self, book_id: BookId) -> StoreResult<Option<BookWithOwner>> {
        (**self).get_book(book_id)
    }

    fn update_book(&self, book_id: BookId, draft: &BookDraft) -> StoreResult<()> {
        (**self).update_book(book_id, draft)
    }

    fn delete_book(&self, book_id: BookId) -> StoreResult<()> {
        (**self).delete_book(book_id)
    }

    fn set_book_status(&self, book_id: BookId, status: BookStatus) -> StoreResult<()> {
        (**self).set_book_status(book_id, status)
    }

    fn list_books(
        &self,
        filters: &BookFilters,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<BookWithOwner>> {
        (**self).list_books(filters, limit, offset)
    }

    fn count_books(&self, filters: &BookFilters) -> StoreResult<i64> {
        (**self).count_books(filters)
    }

    fn books_by_user(&self, user_id: UserId) -> StoreResult<Vec<Book>> {
        (**self).books_by_user(user_id)
    }

    fn genres(&self) -> StoreResult<Vec<String>> {
        (**self).genres()
    }

    fn statistics(&self) -> StoreResult<BookStatistics> {
        (**self).statistics()
    }
}

impl<T: WishlistStore + ?Sized> WishlistStore for Arc<T> {
    fn wishlist_has(&self, user_id: UserId, book_id: BookId) -> StoreResult<bool> {
        (**self).wishlist_has(user_id, book_id)
    }

    fn wishlist_add(&self, user_id: UserId, book_id: BookId) -> StoreResult<()> {
        (**self).wishlist_add(user_id, book_id)
    }

    fn wishlist_remove(&self, user_id: UserId, book_id: BookId) -> StoreResult<()> {
        (**self).wishlist_remove(user_id, book_id)
    }

    fn wishlist_for_user(&self, user_id: UserId) -> StoreResult<Vec<WishlistItem>> {
        (**self).wishlist_for_user(user_id)
    }

    fn wishlist_count(&self, user_id: UserId) -> StoreResult<i64> {
        (**self).wishlist_count(user_id)
    }
}

impl<T: ContactStore + ?Sized> ContactStore for Arc<T> {
    fn create_message(&self, message: &NewMessage) -> StoreResult<i64> {
        (**self).create_message(message)
    }

    fn list_messages(
        &self,
        status: Option<MessageStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<ContactMessage>> {
        (**self).list_messages(status, limit, offset)
    }

    fn count_messages(&self, status: Option<MessageStatus>) -> StoreResult<i64> {
        (**self).count_messages(status)
    }

    fn set_message_status(&self, id: i64, status: MessageStatus) -> StoreResult<()> {
        (**self).set_message_status(id, status)
    }

    fn delete_message(&self, id: i64) -> StoreResult<()> {
        (**self).delete_message(id)
    }
}

//! In-memory storage implementation, used by tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    Book, BookDraft, BookFilters, BookId, BookStatistics, BookStatus, BookStore, BookWithOwner,
    ContactMessage, ContactStore, Flash, MessageStatus, NewMessage, NewUser, ProfileUpdate,
    RememberToken, Role, Session, SessionId, SessionStore, SortOrder, StoreResult, User, UserId,
    UserStore, WishlistItem, WishlistStore,
};
use crate::crypto::generate_token;
use crate::error::ExchangeError;

/// In-memory store implementing every storage trait
pub struct InMemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    remember_tokens: RwLock<HashMap<String, RememberToken>>,
    sessions: RwLock<HashMap<SessionId, Session>>,
    flashes: RwLock<HashMap<SessionId, Flash>>,
    books: RwLock<HashMap<BookId, Book>>,
    wishlist: RwLock<HashMap<(UserId, BookId), DateTime<Utc>>>,
    messages: RwLock<HashMap<i64, ContactMessage>>,
    next_user_id: AtomicI64,
    next_book_id: AtomicI64,
    next_message_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            remember_tokens: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            flashes: RwLock::new(HashMap::new()),
            books: RwLock::new(HashMap::new()),
            wishlist: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
            next_user_id: AtomicI64::new(1),
            next_book_id: AtomicI64::new(1),
            next_message_id: AtomicI64::new(1),
        }
    }

    /// Backdate a remember token's expiry (for testing purposes)
    pub fn set_remember_expiry(&self, token: &str, expires_at: DateTime<Utc>) {
        if let Some(row) = self.remember_tokens.write().unwrap().get_mut(token) {
            row.expires_at = expires_at;
        }
    }

    /// Backdate a reset token's expiry (for testing purposes)
    pub fn set_reset_expiry(&self, email: &str, expires_at: DateTime<Utc>) {
        let normalized = email.to_lowercase();
        let mut users = self.users.write().unwrap();
        if let Some(user) = users.values_mut().find(|u| u.email == normalized) {
            user.reset_token_expiry = Some(expires_at);
        }
    }

    /// Promote a user to admin (for testing purposes)
    pub fn set_role(&self, user_id: UserId, role: Role) {
        if let Some(user) = self.users.write().unwrap().get_mut(&user_id) {
            user.role = role;
        }
    }

    fn with_owner(&self, book: &Book) -> BookWithOwner {
        let users = self.users.read().unwrap();
        let owner = users.get(&book.user_id);
        BookWithOwner {
            book: book.clone(),
            owner_name: owner.map(|u| u.name.clone()),
            owner_location: owner.and_then(|u| u.location.clone()),
            owner_bio: owner.and_then(|u| u.bio.clone()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(book: &Book, filters: &BookFilters) -> bool {
    if let Some(status) = filters.status {
        if book.status != status {
            return false;
        }
    }
    if let Some(genre) = &filters.genre {
        if &book.genre != genre {
            return false;
        }
    }
    if let Some(condition) = filters.condition {
        if book.condition != condition {
            return false;
        }
    }
    if let Some(exchange_type) = filters.exchange_type {
        if book.exchange_type != exchange_type {
            return false;
        }
    }
    if let Some(search) = &filters.search {
        let needle = search.to_lowercase();
        let haystack = format!(
            "{} {} {} {}",
            book.title, book.author, book.genre, book.description
        )
        .to_lowercase();
        if !haystack.contains(&needle) {
            return false;
        }
    }
    true
}

fn sort_books(books: &mut [Book], sort: SortOrder) {
    match sort {
        SortOrder::Newest => books.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.0.cmp(&a.id.0))
        }),
        SortOrder::Oldest => books.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.id.0.cmp(&b.id.0))
        }),
        SortOrder::Title => books.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.0.cmp(&b.id.0))
        }),
        SortOrder::Condition => books.sort_by(|a, b| {
            a.condition
                .rank()
                .cmp(&b.condition.rank())
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.0.cmp(&b.id.0))
        }),
    }
}

impl UserStore for InMemoryStore {
    fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        let normalized = user.email.to_lowercase();
        let mut users = self.users.write().unwrap();
        if users.values().any(|u| u.email == normalized) {
            return Err(ExchangeError::EmailTaken);
        }

        let id = UserId(self.next_user_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        users.insert(
            id,
            User {
                id,
                name: user.name,
                email: normalized,
                password_hash: user.password_hash,
                role: Role::User,
                email_verified: false,
                verification_token: user.verification_token,
                location: None,
                bio: None,
                reset_token: None,
                reset_token_expiry: None,
                last_login: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users.read().unwrap().get(&user_id).cloned())
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let normalized = email.to_lowercase();
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.email == normalized)
            .cloned())
    }

    fn verify_email(&self, email: &str) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let mut users = self.users.write().unwrap();
        if let Some(user) = users.values_mut().find(|u| u.email == normalized) {
            user.email_verified = true;
            user.verification_token = None;
            user.updated_at = Utc::now();
            Ok(())
        } else {
            Err(ExchangeError::EmailNotFound)
        }
    }

    fn update_last_login(&self, user_id: UserId) -> StoreResult<()> {
        if let Some(user) = self.users.write().unwrap().get_mut(&user_id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    fn update_password(&self, user_id: UserId, password_hash: &str) -> StoreResult<()> {
        let mut users = self.users.write().unwrap();
        if let Some(user) = users.get_mut(&user_id) {
            user.password_hash = password_hash.to_string();
            user.updated_at = Utc::now();
            Ok(())
        } else {
            Err(ExchangeError::NotFound("User"))
        }
    }

    fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> StoreResult<()> {
        let mut users = self.users.write().unwrap();
        if let Some(user) = users.get_mut(&user_id) {
            user.name = update.name.clone();
            user.location = update.location.clone();
            user.bio = update.bio.clone();
            user.updated_at = Utc::now();
            Ok(())
        } else {
            Err(ExchangeError::NotFound("User"))
        }
    }

    fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().unwrap().values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        Ok(users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    fn count_users(&self) -> StoreResult<i64> {
        Ok(self.users.read().unwrap().len() as i64)
    }

    fn delete_user(&self, user_id: UserId) -> StoreResult<()> {
        self.users.write().unwrap().remove(&user_id);

        // Cascade: the user's books, then wishlist rows pointing at them
        let removed_books: Vec<BookId> = {
            let mut books = self.books.write().unwrap();
            let ids: Vec<BookId> = books
                .values()
                .filter(|b| b.user_id == user_id)
                .map(|b| b.id)
                .collect();
            books.retain(|_, b| b.user_id != user_id);
            ids
        };
        self.wishlist
            .write()
            .unwrap()
            .retain(|(uid, bid), _| *uid != user_id && !removed_books.contains(bid));

        self.sessions
            .write()
            .unwrap()
            .retain(|_, s| s.user_id != Some(user_id));
        self.remember_tokens
            .write()
            .unwrap()
            .retain(|_, t| t.user_id != user_id);
        Ok(())
    }

    fn set_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut users = self.users.write().unwrap();
        if let Some(user) = users.get_mut(&user_id) {
            user.reset_token = Some(token.to_string());
            user.reset_token_expiry = Some(expires_at);
            Ok(())
        } else {
            Err(ExchangeError::NotFound("User"))
        }
    }

    fn get_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    fn clear_reset_token(&self, user_id: UserId) -> StoreResult<()> {
        if let Some(user) = self.users.write().unwrap().get_mut(&user_id) {
            user.reset_token = None;
            user.reset_token_expiry = None;
        }
        Ok(())
    }

    fn upsert_remember_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tokens = self.remember_tokens.write().unwrap();
        tokens.retain(|_, t| t.user_id != user_id);
        tokens.insert(
            token.to_string(),
            RememberToken {
                user_id,
                token: token.to_string(),
                expires_at,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn get_remember_token(&self, token: &str) -> StoreResult<Option<RememberToken>> {
        Ok(self.remember_tokens.read().unwrap().get(token).cloned())
    }

    fn extend_remember_token(&self, token: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        if let Some(row) = self.remember_tokens.write().unwrap().get_mut(token) {
            row.expires_at = expires_at;
        }
        Ok(())
    }

    fn delete_remember_token(&self, token: &str) -> StoreResult<()> {
        self.remember_tokens.write().unwrap().remove(token);
        Ok(())
    }
}

impl SessionStore for InMemoryStore {
    fn create_session(&self, user_id: Option<UserId>) -> StoreResult<Session> {
        let session = Session {
            id: SessionId(Uuid::new_v4().to_string()),
            user_id,
            csrf_token: generate_token(),
            created_at: Utc::now(),
            logged_in_at: user_id.map(|_| Utc::now()),
        };
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get_session(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().unwrap().get(session_id).cloned())
    }

    fn delete_session(&self, session_id: &SessionId) -> StoreResult<()> {
        self.sessions.write().unwrap().remove(session_id);
        self.flashes.write().unwrap().remove(session_id);
        Ok(())
    }

    fn set_flash(&self, session_id: &SessionId, flash: &Flash) -> StoreResult<()> {
        self.flashes
            .write()
            .unwrap()
            .insert(session_id.clone(), flash.clone());
        Ok(())
    }

    fn take_flash(&self, session_id: &SessionId) -> StoreResult<Option<Flash>> {
        Ok(self.flashes.write().unwrap().remove(session_id))
    }
}

impl BookStore for InMemoryStore {
    fn create_book(&self, owner: UserId, draft: &BookDraft) -> StoreResult<BookId> {
        let id = BookId(self.next_book_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        self.books.write().unwrap().insert(
            id,
            Book {
                id,
                user_id: owner,
                title: draft.title.clone(),
                author: draft.author.clone(),
                isbn: draft.isbn.clone(),
                genre: draft.genre.clone(),
                condition: draft.condition,
                description: draft.description.clone(),
                image_file: draft.image_file.clone(),
                year_published: draft.year_published,
                exchange_type: draft.exchange_type,
                status: BookStatus::Available,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn get_book(&self, book_id: BookId) -> StoreResult<Option<BookWithOwner>> {
        let book = self.books.read().unwrap().get(&book_id).cloned();
        Ok(book.map(|b| self.with_owner(&b)))
    }

    fn update_book(&self, book_id: BookId, draft: &BookDraft) -> StoreResult<()> {
        let mut books = self.books.write().unwrap();
        if let Some(book) = books.get_mut(&book_id) {
            book.title = draft.title.clone();
            book.author = draft.author.clone();
            book.isbn = draft.isbn.clone();
            book.genre = draft.genre.clone();
            book.condition = draft.condition;
            book.description = draft.description.clone();
            book.image_file = draft.image_file.clone();
            book.year_published = draft.year_published;
            book.exchange_type = draft.exchange_type;
            book.updated_at = Utc::now();
            Ok(())
        } else {
            Err(ExchangeError::NotFound("Book"))
        }
    }

    fn delete_book(&self, book_id: BookId) -> StoreResult<()> {
        self.books.write().unwrap().remove(&book_id);
        self.wishlist
            .write()
            .unwrap()
            .retain(|(_, bid), _| *bid != book_id);
        Ok(())
    }

    fn set_book_status(&self, book_id: BookId, status: BookStatus) -> StoreResult<()> {
        let mut books = self.books.write().unwrap();
        if let Some(book) = books.get_mut(&book_id) {
            book.status = status;
            book.updated_at = Utc::now();
            Ok(())
        } else {
            Err(ExchangeError::NotFound("Book"))
        }
    }

    fn list_books(
        &self,
        filters: &BookFilters,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<BookWithOwner>> {
        let mut books: Vec<Book> = self
            .books
            .read()
            .unwrap()
            .values()
            .filter(|b| matches(b, filters))
            .cloned()
            .collect();
        sort_books(&mut books, filters.sort);
        Ok(books
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|b| self.with_owner(&b))
            .collect())
    }

    fn count_books(&self, filters: &BookFilters) -> StoreResult<i64> {
        Ok(self
            .books
            .read()
            .unwrap()
            .values()
            .filter(|b| matches(b, filters))
            .count() as i64)
    }

    fn books_by_user(&self, user_id: UserId) -> StoreResult<Vec<Book>> {
        let mut books: Vec<Book> = self
            .books
            .read()
            .unwrap()
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        sort_books(&mut books, SortOrder::Newest);
        Ok(books)
    }

    fn genres(&self) -> StoreResult<Vec<String>> {
        let mut genres: Vec<String> = self
            .books
            .read()
            .unwrap()
            .values()
            .filter(|b| b.status == BookStatus::Available)
            .map(|b| b.genre.clone())
            .collect();
        genres.sort();
        genres.dedup();
        Ok(genres)
    }

    fn statistics(&self) -> StoreResult<BookStatistics> {
        let books = self.books.read().unwrap();
        let mut stats = BookStatistics {
            total_books: books.len() as i64,
            ..BookStatistics::default()
        };
        let mut genres: Vec<&str> = Vec::new();
        let mut owners: Vec<UserId> = Vec::new();
        for book in books.values() {
            match book.status {
                BookStatus::Available => stats.available_books += 1,
                BookStatus::Pending => stats.pending_books += 1,
                BookStatus::Exchanged => stats.exchanged_books += 1,
            }
            if !genres.contains(&book.genre.as_str()) {
                genres.push(&book.genre);
            }
            if !owners.contains(&book.user_id) {
                owners.push(book.user_id);
            }
        }
        stats.unique_genres = genres.len() as i64;
        stats.unique_owners = owners.len() as i64;
        Ok(stats)
    }
}

impl WishlistStore for InMemoryStore {
    fn wishlist_has(&self, user_id: UserId, book_id: BookId) -> StoreResult<bool> {
        Ok(self
            .wishlist
            .read()
            .unwrap()
            .contains_key(&(user_id, book_id)))
    }

    fn wishlist_add(&self, user_id: UserId, book_id: BookId) -> StoreResult<()> {
        let mut wishlist = self.wishlist.write().unwrap();
        if wishlist.contains_key(&(user_id, book_id)) {
            return Err(ExchangeError::AlreadyInWishlist);
        }
        wishlist.insert((user_id, book_id), Utc::now());
        Ok(())
    }

    fn wishlist_remove(&self, user_id: UserId, book_id: BookId) -> StoreResult<()> {
        self.wishlist.write().unwrap().remove(&(user_id, book_id));
        Ok(())
    }

    fn wishlist_for_user(&self, user_id: UserId) -> StoreResult<Vec<WishlistItem>> {
        let entries: Vec<(BookId, DateTime<Utc>)> = self
            .wishlist
            .read()
            .unwrap()
            .iter()
            .filter(|((uid, _), _)| *uid == user_id)
            .map(|((_, bid), added)| (*bid, *added))
            .collect();

        let books = self.books.read().unwrap();
        let mut items: Vec<WishlistItem> = entries
            .into_iter()
            .filter_map(|(book_id, added_at)| {
                books
                    .get(&book_id)
                    .filter(|b| b.status == BookStatus::Available)
                    .map(|b| (b.clone(), added_at))
            })
            .collect::<Vec<(Book, DateTime<Utc>)>>()
            .into_iter()
            .map(|(book, added_at)| WishlistItem {
                listing: self.with_owner(&book),
                added_at,
            })
            .collect();
        items.sort_by(|a, b| {
            b.added_at
                .cmp(&a.added_at)
                .then(b.listing.book.id.0.cmp(&a.listing.book.id.0))
        });
        Ok(items)
    }

    fn wishlist_count(&self, user_id: UserId) -> StoreResult<i64> {
        let books = self.books.read().unwrap();
        Ok(self
            .wishlist
            .read()
            .unwrap()
            .keys()
            .filter(|(uid, bid)| {
                *uid == user_id
                    && books
                        .get(bid)
                        .map(|b| b.status == BookStatus::Available)
                        .unwrap_or(false)
            })
            .count() as i64)
    }
}

impl ContactStore for InMemoryStore {
    fn create_message(&self, message: &NewMessage) -> StoreResult<i64> {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.messages.write().unwrap().insert(
            id,
            ContactMessage {
                id,
                name: message.name.clone(),
                email: message.email.clone(),
                subject: message.subject.clone(),
                message: message.message.clone(),
                status: MessageStatus::Unread,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn list_messages(
        &self,
        status: Option<MessageStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<ContactMessage>> {
        let mut messages: Vec<ContactMessage> = self
            .messages
            .read()
            .unwrap()
            .values()
            .filter(|m| status.map(|s| m.status == s).unwrap_or(true))
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(messages
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    fn count_messages(&self, status: Option<MessageStatus>) -> StoreResult<i64> {
        Ok(self
            .messages
            .read()
            .unwrap()
            .values()
            .filter(|m| status.map(|s| m.status == s).unwrap_or(true))
            .count() as i64)
    }

    fn set_message_status(&self, id: i64, status: MessageStatus) -> StoreResult<()> {
        let mut messages = self.messages.write().unwrap();
        if let Some(message) = messages.get_mut(&id) {
            message.status = status;
            Ok(())
        } else {
            Err(ExchangeError::NotFound("Message"))
        }
    }

    fn delete_message(&self, id: i64) -> StoreResult<()> {
        if self.messages.write().unwrap().remove(&id).is_none() {
            return Err(ExchangeError::NotFound("Message"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Condition;
    use crate::store::ExchangeType;

    fn seed_user(store: &InMemoryStore, email: &str) -> UserId {
        store
            .create_user(NewUser {
                name: "Tester".to_string(),
                email: email.to_string(),
                password_hash: "hashed_password".to_string(),
                verification_token: None,
            })
            .unwrap()
    }

    fn draft(title: &str, genre: &str, condition: Condition) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: "Some Author".to_string(),
            isbn: None,
            genre: genre.to_string(),
            condition,
            description: "A test listing".to_string(),
            image_file: None,
            year_published: None,
            exchange_type: ExchangeType::Trade,
        }
    }

    #[test]
    fn test_create_user_and_lookup() {
        let store = InMemoryStore::new();

        let user_id = seed_user(&store, "Test@Example.COM");
        let user = store.get_user_by_email("test@example.com").unwrap();
        assert!(user.is_some());
        assert_eq!(user.unwrap().id, user_id);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = InMemoryStore::new();

        seed_user(&store, "test@example.com");
        let result = store.create_user(NewUser {
            name: "Other".to_string(),
            email: "TEST@example.com".to_string(),
            password_hash: "hash".to_string(),
            verification_token: None,
        });
        assert!(matches!(result, Err(ExchangeError::EmailTaken)));
    }

    #[test]
    fn test_title_sort_ignores_case() {
        let store = InMemoryStore::new();
        let owner = seed_user(&store, "owner@example.com");

        store.create_book(owner, &draft("zebra", "Fiction", Condition::Good)).unwrap();
        store.create_book(owner, &draft("Apple", "Fiction", Condition::Good)).unwrap();
        store.create_book(owner, &draft("mango", "Fiction", Condition::Good)).unwrap();

        let filters = BookFilters {
            sort: SortOrder::Title,
            ..BookFilters::available()
        };
        let books = store.list_books(&filters, 10, 0).unwrap();
        let titles: Vec<&str> = books.iter().map(|b| b.book.title.as_str()).collect();
        assert_eq!(titles, ["Apple", "mango", "zebra"]);
    }

    #[test]
    fn test_count_matches_list() {
        let store = InMemoryStore::new();
        let owner = seed_user(&store, "owner@example.com");

        for i in 0..5 {
            store
                .create_book(owner, &draft(&format!("Book {i}"), "Fiction", Condition::Good))
                .unwrap();
        }
        let hidden = store.create_book(owner, &draft("Hidden", "Fiction", Condition::Good)).unwrap();
        store.set_book_status(hidden, BookStatus::Pending).unwrap();

        let filters = BookFilters::available();
        let total = store.count_books(&filters).unwrap();
        assert_eq!(total, 5);
        assert_eq!(store.list_books(&filters, total, 0).unwrap().len() as i64, total);
    }

    #[test]
    fn test_wishlist_roundtrip() {
        let store = InMemoryStore::new();
        let owner = seed_user(&store, "owner@example.com");
        let reader = seed_user(&store, "reader@example.com");
        let book = store.create_book(owner, &draft("Dune", "Science Fiction", Condition::Good)).unwrap();

        assert!(!store.wishlist_has(reader, book).unwrap());
        store.wishlist_add(reader, book).unwrap();
        assert!(store.wishlist_has(reader, book).unwrap());
        assert!(matches!(
            store.wishlist_add(reader, book),
            Err(ExchangeError::AlreadyInWishlist)
        ));
        store.wishlist_remove(reader, book).unwrap();
        assert!(!store.wishlist_has(reader, book).unwrap());
    }

    #[test]
    fn test_session_lifecycle() {
        let store = InMemoryStore::new();

        let session = store.create_session(None).unwrap();
        assert!(store.get_session(&session.id).unwrap().is_some());

        store.delete_session(&session.id).unwrap();
        assert!(store.get_session(&session.id).unwrap().is_none());
    }
}

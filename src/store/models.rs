//! Data models for exchange storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Unique book identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookId(pub i64);

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Physical condition of a listed book, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Condition {
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::LikeNew => "Like New",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Poor => "Poor",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "New" => Some(Condition::New),
            "Like New" => Some(Condition::LikeNew),
            "Good" => Some(Condition::Good),
            "Fair" => Some(Condition::Fair),
            "Poor" => Some(Condition::Poor),
            _ => None,
        }
    }

    /// Sort rank, 0 is best.
    pub fn rank(&self) -> u8 {
        match self {
            Condition::New => 0,
            Condition::LikeNew => 1,
            Condition::Good => 2,
            Condition::Fair => 3,
            Condition::Poor => 4,
        }
    }
}

/// Whether a book is offered for reciprocal trade or unconditional giveaway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeType {
    Trade,
    Giveaway,
}

impl ExchangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeType::Trade => "trade",
            ExchangeType::Giveaway => "giveaway",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "trade" => Some(ExchangeType::Trade),
            "giveaway" => Some(ExchangeType::Giveaway),
            _ => None,
        }
    }
}

/// Listing status of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Available,
    Pending,
    Exchanged,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Pending => "pending",
            BookStatus::Exchanged => "exchanged",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "available" => Some(BookStatus::Available),
            "pending" => Some(BookStatus::Pending),
            "exchanged" => Some(BookStatus::Exchanged),
            _ => None,
        }
    }
}

/// A registered user account
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub email_verified: bool,
    pub verification_token: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub verification_token: Option<String>,
}

/// Profile fields a user may edit
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub location: Option<String>,
    pub bio: Option<String>,
}

/// A remember-me token persisted server-side; at most one per user.
#[derive(Debug, Clone)]
pub struct RememberToken {
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A server-side session. `user_id` is None for anonymous sessions,
/// which exist so pre-auth forms carry a CSRF secret.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user_id: Option<UserId>,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
    pub logged_in_at: Option<DateTime<Utc>>,
}

/// A one-shot notice carried across a redirect boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(FlashKind::Success),
            "error" => Some(FlashKind::Error),
            _ => None,
        }
    }
}

/// A listed book
#[derive(Debug, Clone)]
pub struct Book {
    pub id: BookId,
    pub user_id: UserId,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub genre: String,
    pub condition: Condition,
    pub description: String,
    pub image_file: Option<String>,
    pub year_published: Option<i32>,
    pub exchange_type: ExchangeType,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A book joined with its owner's public profile fields
#[derive(Debug, Clone)]
pub struct BookWithOwner {
    pub book: Book,
    pub owner_name: Option<String>,
    pub owner_location: Option<String>,
    pub owner_bio: Option<String>,
}

/// Fields required to create or replace a book listing
#[derive(Debug, Clone)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub genre: String,
    pub condition: Condition,
    pub description: String,
    pub image_file: Option<String>,
    pub year_published: Option<i32>,
    pub exchange_type: ExchangeType,
}

/// Catalog filter set shared by the listing and count queries.
#[derive(Debug, Clone, Default)]
pub struct BookFilters {
    /// Case-insensitive substring, OR'd across title/author/genre/description
    pub search: Option<String>,
    pub genre: Option<String>,
    pub condition: Option<Condition>,
    pub exchange_type: Option<ExchangeType>,
    /// None means any status (admin listings); public queries set Available
    pub status: Option<BookStatus>,
    pub sort: SortOrder,
}

impl BookFilters {
    /// Public catalog filters: available books only.
    pub fn available() -> Self {
        Self {
            status: Some(BookStatus::Available),
            ..Self::default()
        }
    }
}

/// Catalog sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Title,
    /// Best condition first, rank per [`Condition::rank`]
    Condition,
}

impl SortOrder {
    /// Parse a `sort` query value; anything unrecognized falls back to
    /// `Newest`.
    pub fn from_param(s: &str) -> Self {
        match s {
            "oldest" => SortOrder::Oldest,
            "title" => SortOrder::Title,
            "condition" | "condition-best" => SortOrder::Condition,
            _ => SortOrder::Newest,
        }
    }
}

/// A wishlist row joined with its book and owner
#[derive(Debug, Clone)]
pub struct WishlistItem {
    pub listing: BookWithOwner,
    pub added_at: DateTime<Utc>,
}

/// Message status in the admin inbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Unread,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Unread => "unread",
            MessageStatus::Read => "read",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unread" => Some(MessageStatus::Unread),
            "read" => Some(MessageStatus::Read),
            _ => None,
        }
    }
}

/// A message submitted through the public contact form
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields from the contact form
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Aggregate numbers for the admin dashboard
#[derive(Debug, Clone, Default, Serialize)]
pub struct BookStatistics {
    pub total_books: i64,
    pub available_books: i64,
    pub pending_books: i64,
    pub exchanged_books: i64,
    pub unique_genres: i64,
    pub unique_owners: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_round_trip() {
        for condition in [
            Condition::New,
            Condition::LikeNew,
            Condition::Good,
            Condition::Fair,
            Condition::Poor,
        ] {
            assert_eq!(Condition::from_str(condition.as_str()), Some(condition));
        }
        assert_eq!(Condition::from_str("Mint"), None);
    }

    #[test]
    fn test_condition_rank_orders_best_first() {
        assert!(Condition::New.rank() < Condition::LikeNew.rank());
        assert!(Condition::LikeNew.rank() < Condition::Good.rank());
        assert!(Condition::Good.rank() < Condition::Fair.rank());
        assert!(Condition::Fair.rank() < Condition::Poor.rank());
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!(SortOrder::from_param("oldest"), SortOrder::Oldest);
        assert_eq!(SortOrder::from_param("title"), SortOrder::Title);
        assert_eq!(SortOrder::from_param("condition"), SortOrder::Condition);
        assert_eq!(SortOrder::from_param("condition-best"), SortOrder::Condition);
        // Unknown values fall back to the default order
        assert_eq!(SortOrder::from_param("relevance"), SortOrder::Newest);
        assert_eq!(SortOrder::from_param(""), SortOrder::Newest);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            BookStatus::Available,
            BookStatus::Pending,
            BookStatus::Exchanged,
        ] {
            assert_eq!(BookStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(BookStatus::from_str("lost"), None);
    }
}

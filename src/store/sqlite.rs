//! SQLite-based storage implementation

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{
    Book, BookDraft, BookFilters, BookId, BookStatistics, BookStatus, BookStore, BookWithOwner,
    Condition, ContactMessage, ContactStore, ExchangeType, Flash, FlashKind, MessageStatus,
    NewMessage, NewUser, ProfileUpdate, RememberToken, Role, Session, SessionId, SessionStore,
    SortOrder, StoreResult, User, UserId, UserStore, WishlistItem, WishlistStore,
};
use crate::crypto::generate_token;
use crate::error::ExchangeError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, email_verified, \
     verification_token, location, bio, reset_token, reset_token_expiry, last_login, \
     created_at, updated_at";

const LISTING_COLUMNS: &str = "b.id, b.user_id, b.title, b.author, b.isbn, b.genre, \
     b.condition, b.description, b.image_file, b.year_published, b.exchange_type, b.status, \
     b.created_at, b.updated_at, u.name, u.location, u.bio";

/// SQLite-based store implementing every storage trait
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // Enable foreign keys
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Run migrations
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> StoreResult<()> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> StoreResult<i32> {
        let table_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        let version = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })?;
        Ok(version)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Users
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                email_verified INTEGER NOT NULL DEFAULT 0,
                verification_token TEXT,
                location TEXT,
                bio TEXT,
                reset_token TEXT,
                reset_token_expiry TEXT,
                last_login TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Remember-me tokens, one row per user
            CREATE TABLE IF NOT EXISTS user_sessions (
                user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                session_token TEXT NOT NULL UNIQUE,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Server-side sessions; user_id is NULL until login
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
                csrf_token TEXT NOT NULL,
                created_at TEXT NOT NULL,
                logged_in_at TEXT,
                flash_kind TEXT,
                flash_message TEXT
            );

            -- Book listings
            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                isbn TEXT,
                genre TEXT NOT NULL,
                condition TEXT NOT NULL,
                description TEXT NOT NULL,
                image_file TEXT,
                year_published INTEGER,
                exchange_type TEXT NOT NULL DEFAULT 'trade',
                status TEXT NOT NULL DEFAULT 'available',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_books_user_id ON books(user_id);
            CREATE INDEX IF NOT EXISTS idx_books_status ON books(status);

            -- Wishlist; the composite key makes duplicate adds fail cleanly
            CREATE TABLE IF NOT EXISTS wishlist (
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                added_at TEXT NOT NULL,
                PRIMARY KEY (user_id, book_id)
            );

            -- Contact form messages
            CREATE TABLE IF NOT EXISTS contact_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                subject TEXT NOT NULL,
                message TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'unread',
                created_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_ts_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get(4)?;
    let verified: i64 = row.get(5)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;
    Ok(User {
        id: UserId(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: Role::from_str(&role).unwrap_or(Role::User),
        email_verified: verified != 0,
        verification_token: row.get(6)?,
        location: row.get(7)?,
        bio: row.get(8)?,
        reset_token: row.get(9)?,
        reset_token_expiry: parse_ts_opt(row.get(10)?),
        last_login: parse_ts_opt(row.get(11)?),
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    })
}

fn row_to_book(row: &Row) -> rusqlite::Result<Book> {
    let condition: String = row.get(6)?;
    let exchange_type: String = row.get(10)?;
    let status: String = row.get(11)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;
    Ok(Book {
        id: BookId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        title: row.get(2)?,
        author: row.get(3)?,
        isbn: row.get(4)?,
        genre: row.get(5)?,
        condition: Condition::from_str(&condition).unwrap_or(Condition::Good),
        description: row.get(7)?,
        image_file: row.get(8)?,
        year_published: row.get(9)?,
        exchange_type: ExchangeType::from_str(&exchange_type).unwrap_or(ExchangeType::Trade),
        status: BookStatus::from_str(&status).unwrap_or(BookStatus::Available),
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    })
}

fn row_to_listing(row: &Row) -> rusqlite::Result<BookWithOwner> {
    Ok(BookWithOwner {
        book: row_to_book(row)?,
        owner_name: row.get(14)?,
        owner_location: row.get(15)?,
        owner_bio: row.get(16)?,
    })
}

/// Append the WHERE fragments shared by the listing and count queries.
/// Both go through here so the pagination denominator can never drift
/// from the page contents.
fn push_filters(filters: &BookFilters, sql: &mut String, values: &mut Vec<Value>) {
    if let Some(status) = filters.status {
        sql.push_str(" AND b.status = ?");
        values.push(Value::from(status.as_str().to_string()));
    }
    if let Some(genre) = &filters.genre {
        sql.push_str(" AND b.genre = ?");
        values.push(Value::from(genre.clone()));
    }
    if let Some(condition) = filters.condition {
        sql.push_str(" AND b.condition = ?");
        values.push(Value::from(condition.as_str().to_string()));
    }
    if let Some(exchange_type) = filters.exchange_type {
        sql.push_str(" AND b.exchange_type = ?");
        values.push(Value::from(exchange_type.as_str().to_string()));
    }
    if let Some(search) = &filters.search {
        sql.push_str(
            " AND (b.title LIKE ? OR b.author LIKE ? OR b.genre LIKE ? OR b.description LIKE ?)",
        );
        let pattern = format!("%{search}%");
        for _ in 0..4 {
            values.push(Value::from(pattern.clone()));
        }
    }
}

fn order_clause(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Newest => " ORDER BY b.created_at DESC, b.id DESC",
        SortOrder::Oldest => " ORDER BY b.created_at ASC, b.id ASC",
        SortOrder::Title => " ORDER BY b.title COLLATE NOCASE ASC, b.created_at ASC, b.id ASC",
        SortOrder::Condition => {
            " ORDER BY CASE b.condition \
               WHEN 'New' THEN 0 WHEN 'Like New' THEN 1 WHEN 'Good' THEN 2 \
               WHEN 'Fair' THEN 3 ELSE 4 END ASC, b.created_at ASC, b.id ASC"
        }
    }
}

impl UserStore for SqliteStore {
    fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO users (name, email, password_hash, verification_token, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                user.name,
                user.email.to_lowercase(),
                user.password_hash,
                user.verification_token,
                now,
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return ExchangeError::EmailTaken;
                }
            }
            ExchangeError::Database(e)
        })?;

        Ok(UserId(conn.last_insert_rowid()))
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![user_id.0],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![normalized],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn verify_email(&self, email: &str) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let rows_affected = conn.execute(
            "UPDATE users SET email_verified = 1, verification_token = NULL, updated_at = ?1
             WHERE email = ?2",
            params![now, normalized],
        )?;

        if rows_affected == 0 {
            return Err(ExchangeError::EmailNotFound);
        }
        Ok(())
    }

    fn update_last_login(&self, user_id: UserId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), user_id.0],
        )?;
        Ok(())
    }

    fn update_password(&self, user_id: UserId, password_hash: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, Utc::now().to_rfc3339(), user_id.0],
        )?;

        if rows_affected == 0 {
            return Err(ExchangeError::NotFound("User"));
        }
        Ok(())
    }

    fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE users SET name = ?1, location = ?2, bio = ?3, updated_at = ?4 WHERE id = ?5",
            params![
                update.name,
                update.location,
                update.bio,
                Utc::now().to_rfc3339(),
                user_id.0
            ],
        )?;

        if rows_affected == 0 {
            return Err(ExchangeError::NotFound("User"));
        }
        Ok(())
    }

    fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
        ))?;
        let users = stmt
            .query_map(params![limit, offset], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn count_users(&self) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    fn delete_user(&self, user_id: UserId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        // Books, wishlist rows, sessions, and remember tokens cascade
        conn.execute("DELETE FROM users WHERE id = ?1", params![user_id.0])?;
        Ok(())
    }

    fn set_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE users SET reset_token = ?1, reset_token_expiry = ?2 WHERE id = ?3",
            params![token, expires_at.to_rfc3339(), user_id.0],
        )?;

        if rows_affected == 0 {
            return Err(ExchangeError::NotFound("User"));
        }
        Ok(())
    }

    fn get_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE reset_token = ?1"),
                params![token],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn clear_reset_token(&self, user_id: UserId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET reset_token = NULL, reset_token_expiry = NULL WHERE id = ?1",
            params![user_id.0],
        )?;
        Ok(())
    }

    fn upsert_remember_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user_sessions (user_id, session_token, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                 session_token = excluded.session_token,
                 expires_at = excluded.expires_at",
            params![
                user_id.0,
                token,
                expires_at.to_rfc3339(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn get_remember_token(&self, token: &str) -> StoreResult<Option<RememberToken>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT user_id, session_token, expires_at, created_at
                 FROM user_sessions WHERE session_token = ?1",
                params![token],
                |row| {
                    let expires_at: String = row.get(2)?;
                    let created_at: String = row.get(3)?;
                    Ok(RememberToken {
                        user_id: UserId(row.get(0)?),
                        token: row.get(1)?,
                        expires_at: parse_ts(&expires_at),
                        created_at: parse_ts(&created_at),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn extend_remember_token(&self, token: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE user_sessions SET expires_at = ?1 WHERE session_token = ?2",
            params![expires_at.to_rfc3339(), token],
        )?;
        Ok(())
    }

    fn delete_remember_token(&self, token: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM user_sessions WHERE session_token = ?1",
            params![token],
        )?;
        Ok(())
    }
}

impl SessionStore for SqliteStore {
    fn create_session(&self, user_id: Option<UserId>) -> StoreResult<Session> {
        let conn = self.conn.lock().unwrap();
        let session = Session {
            id: SessionId(Uuid::new_v4().to_string()),
            user_id,
            csrf_token: generate_token(),
            created_at: Utc::now(),
            logged_in_at: user_id.map(|_| Utc::now()),
        };

        conn.execute(
            "INSERT INTO sessions (id, user_id, csrf_token, created_at, logged_in_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id.0,
                session.user_id.map(|u| u.0),
                session.csrf_token,
                session.created_at.to_rfc3339(),
                session.logged_in_at.map(|t| t.to_rfc3339()),
            ],
        )?;

        Ok(session)
    }

    fn get_session(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();
        let session = conn
            .query_row(
                "SELECT id, user_id, csrf_token, created_at, logged_in_at
                 FROM sessions WHERE id = ?1",
                params![session_id.0],
                |row| {
                    let user_id: Option<i64> = row.get(1)?;
                    let created_at: String = row.get(3)?;
                    Ok(Session {
                        id: SessionId(row.get(0)?),
                        user_id: user_id.map(UserId),
                        csrf_token: row.get(2)?,
                        created_at: parse_ts(&created_at),
                        logged_in_at: parse_ts_opt(row.get(4)?),
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    fn delete_session(&self, session_id: &SessionId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id.0])?;
        Ok(())
    }

    fn set_flash(&self, session_id: &SessionId, flash: &Flash) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sessions SET flash_kind = ?1, flash_message = ?2 WHERE id = ?3",
            params![flash.kind.as_str(), flash.message, session_id.0],
        )?;
        Ok(())
    }

    fn take_flash(&self, session_id: &SessionId) -> StoreResult<Option<Flash>> {
        // Read-then-clear must be atomic so the message renders exactly once
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let flash = tx
            .query_row(
                "SELECT flash_kind, flash_message FROM sessions WHERE id = ?1",
                params![session_id.0],
                |row| {
                    let kind: Option<String> = row.get(0)?;
                    let message: Option<String> = row.get(1)?;
                    Ok(kind.zip(message))
                },
            )
            .optional()?
            .flatten()
            .and_then(|(kind, message)| {
                FlashKind::from_str(&kind).map(|kind| Flash { kind, message })
            });

        if flash.is_some() {
            tx.execute(
                "UPDATE sessions SET flash_kind = NULL, flash_message = NULL WHERE id = ?1",
                params![session_id.0],
            )?;
        }
        tx.commit()?;

        Ok(flash)
    }
}

impl BookStore for SqliteStore {
    fn create_book(&self, owner: UserId, draft: &BookDraft) -> StoreResult<BookId> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO books (user_id, title, author, isbn, genre, condition, description,
                                image_file, year_published, exchange_type, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'available', ?11, ?11)",
            params![
                owner.0,
                draft.title,
                draft.author,
                draft.isbn,
                draft.genre,
                draft.condition.as_str(),
                draft.description,
                draft.image_file,
                draft.year_published,
                draft.exchange_type.as_str(),
                now,
            ],
        )?;

        Ok(BookId(conn.last_insert_rowid()))
    }

    fn get_book(&self, book_id: BookId) -> StoreResult<Option<BookWithOwner>> {
        let conn = self.conn.lock().unwrap();
        let book = conn
            .query_row(
                &format!(
                    "SELECT {LISTING_COLUMNS} FROM books b
                     LEFT JOIN users u ON b.user_id = u.id WHERE b.id = ?1"
                ),
                params![book_id.0],
                row_to_listing,
            )
            .optional()?;
        Ok(book)
    }

    fn update_book(&self, book_id: BookId, draft: &BookDraft) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE books SET title = ?1, author = ?2, isbn = ?3, genre = ?4, condition = ?5,
                              description = ?6, image_file = ?7, year_published = ?8,
                              exchange_type = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                draft.title,
                draft.author,
                draft.isbn,
                draft.genre,
                draft.condition.as_str(),
                draft.description,
                draft.image_file,
                draft.year_published,
                draft.exchange_type.as_str(),
                Utc::now().to_rfc3339(),
                book_id.0,
            ],
        )?;

        if rows_affected == 0 {
            return Err(ExchangeError::NotFound("Book"));
        }
        Ok(())
    }

    fn delete_book(&self, book_id: BookId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM books WHERE id = ?1", params![book_id.0])?;
        Ok(())
    }

    fn set_book_status(&self, book_id: BookId, status: BookStatus) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE books SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), Utc::now().to_rfc3339(), book_id.0],
        )?;

        if rows_affected == 0 {
            return Err(ExchangeError::NotFound("Book"));
        }
        Ok(())
    }

    fn list_books(
        &self,
        filters: &BookFilters,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<BookWithOwner>> {
        let mut sql = format!(
            "SELECT {LISTING_COLUMNS} FROM books b
             LEFT JOIN users u ON b.user_id = u.id WHERE 1=1"
        );
        let mut values: Vec<Value> = Vec::new();
        push_filters(filters, &mut sql, &mut values);
        sql.push_str(order_clause(filters.sort));
        sql.push_str(" LIMIT ? OFFSET ?");
        values.push(Value::from(limit));
        values.push(Value::from(offset));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let books = stmt
            .query_map(params_from_iter(values), row_to_listing)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(books)
    }

    fn count_books(&self, filters: &BookFilters) -> StoreResult<i64> {
        let mut sql = String::from("SELECT COUNT(*) FROM books b WHERE 1=1");
        let mut values: Vec<Value> = Vec::new();
        push_filters(filters, &mut sql, &mut values);

        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count)
    }

    fn books_by_user(&self, user_id: UserId) -> StoreResult<Vec<Book>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, author, isbn, genre, condition, description,
                    image_file, year_published, exchange_type, status, created_at, updated_at
             FROM books WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let books = stmt
            .query_map(params![user_id.0], row_to_book)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(books)
    }

    fn genres(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT genre FROM books WHERE status = 'available' ORDER BY genre",
        )?;
        let genres = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(genres)
    }

    fn statistics(&self) -> StoreResult<BookStatistics> {
        let conn = self.conn.lock().unwrap();
        let stats = conn.query_row(
            "SELECT COUNT(*),
                    SUM(CASE WHEN status = 'available' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN status = 'exchanged' THEN 1 ELSE 0 END),
                    COUNT(DISTINCT genre),
                    COUNT(DISTINCT user_id)
             FROM books",
            [],
            |row| {
                Ok(BookStatistics {
                    total_books: row.get(0)?,
                    available_books: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                    pending_books: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    exchanged_books: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                    unique_genres: row.get(4)?,
                    unique_owners: row.get(5)?,
                })
            },
        )?;
        Ok(stats)
    }
}

impl WishlistStore for SqliteStore {
    fn wishlist_has(&self, user_id: UserId, book_id: BookId) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM wishlist WHERE user_id = ?1 AND book_id = ?2",
            params![user_id.0, book_id.0],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn wishlist_add(&self, user_id: UserId, book_id: BookId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO wishlist (user_id, book_id, added_at) VALUES (?1, ?2, ?3)",
            params![user_id.0, book_id.0, Utc::now().to_rfc3339()],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return ExchangeError::AlreadyInWishlist;
                }
            }
            ExchangeError::Database(e)
        })?;
        Ok(())
    }

    fn wishlist_remove(&self, user_id: UserId, book_id: BookId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM wishlist WHERE user_id = ?1 AND book_id = ?2",
            params![user_id.0, book_id.0],
        )?;
        Ok(())
    }

    fn wishlist_for_user(&self, user_id: UserId) -> StoreResult<Vec<WishlistItem>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {LISTING_COLUMNS}, w.added_at FROM wishlist w
             JOIN books b ON w.book_id = b.id
             LEFT JOIN users u ON b.user_id = u.id
             WHERE w.user_id = ?1 AND b.status = 'available'
             ORDER BY w.added_at DESC, b.id DESC"
        ))?;
        let items = stmt
            .query_map(params![user_id.0], |row| {
                let added_at: String = row.get(17)?;
                Ok(WishlistItem {
                    listing: row_to_listing(row)?,
                    added_at: parse_ts(&added_at),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn wishlist_count(&self, user_id: UserId) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM wishlist w
             JOIN books b ON w.book_id = b.id
             WHERE w.user_id = ?1 AND b.status = 'available'",
            params![user_id.0],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl ContactStore for SqliteStore {
    fn create_message(&self, message: &NewMessage) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO contact_messages (name, email, subject, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.name,
                message.email,
                message.subject,
                message.message,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_messages(
        &self,
        status: Option<MessageStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<ContactMessage>> {
        let mut sql = String::from(
            "SELECT id, name, email, subject, message, status, created_at
             FROM contact_messages WHERE 1=1",
        );
        let mut values: Vec<Value> = Vec::new();
        if let Some(status) = status {
            sql.push_str(" AND status = ?");
            values.push(Value::from(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?");
        values.push(Value::from(limit));
        values.push(Value::from(offset));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let messages = stmt
            .query_map(params_from_iter(values), |row| {
                let status: String = row.get(5)?;
                let created_at: String = row.get(6)?;
                Ok(ContactMessage {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    subject: row.get(3)?,
                    message: row.get(4)?,
                    status: MessageStatus::from_str(&status).unwrap_or(MessageStatus::Unread),
                    created_at: parse_ts(&created_at),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    fn count_messages(&self, status: Option<MessageStatus>) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        let count = match status {
            Some(status) => conn.query_row(
                "SELECT COUNT(*) FROM contact_messages WHERE status = ?1",
                params![status.as_str()],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM contact_messages", [], |row| {
                row.get(0)
            })?,
        };
        Ok(count)
    }

    fn set_message_status(&self, id: i64, status: MessageStatus) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE contact_messages SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;

        if rows_affected == 0 {
            return Err(ExchangeError::NotFound("Message"));
        }
        Ok(())
    }

    fn delete_message(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows_affected =
            conn.execute("DELETE FROM contact_messages WHERE id = ?1", params![id])?;

        if rows_affected == 0 {
            return Err(ExchangeError::NotFound("Message"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        (store, dir) // Return dir to keep it alive
    }

    fn seed_user(store: &SqliteStore, email: &str) -> UserId {
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
            year_published: Some(2020),
            exchange_type: ExchangeType::Trade,
        }
    }

    #[test]
    fn test_create_user_and_lookup() {
        let (store, _dir) = create_test_store();

        let user_id = seed_user(&store, "Test@Example.COM");

        // Email is normalized to lowercase
        let user = store.get_user_by_email("test@example.com").unwrap();
        assert!(user.is_some());
        assert_eq!(user.unwrap().id, user_id);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (store, _dir) = create_test_store();

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
    fn test_verify_email() {
        let (store, _dir) = create_test_store();

        seed_user(&store, "test@example.com");
        let user = store.get_user_by_email("test@example.com").unwrap().unwrap();
        assert!(!user.email_verified);

        store.verify_email("test@example.com").unwrap();

        let user = store.get_user_by_email("test@example.com").unwrap().unwrap();
        assert!(user.email_verified);
        assert!(user.verification_token.is_none());
    }

    #[test]
    fn test_remember_token_upsert_replaces() {
        let (store, _dir) = create_test_store();
        let user_id = seed_user(&store, "test@example.com");
        let expiry = Utc::now() + chrono::Duration::days(30);

        store.upsert_remember_token(user_id, "token-one", expiry).unwrap();
        store.upsert_remember_token(user_id, "token-two", expiry).unwrap();

        // The old token is gone, only one row per user
        assert!(store.get_remember_token("token-one").unwrap().is_none());
        let row = store.get_remember_token("token-two").unwrap().unwrap();
        assert_eq!(row.user_id, user_id);
    }

    #[test]
    fn test_session_lifecycle() {
        let (store, _dir) = create_test_store();
        let user_id = seed_user(&store, "test@example.com");

        let anon = store.create_session(None).unwrap();
        assert!(anon.user_id.is_none());
        assert_eq!(anon.csrf_token.len(), 64);

        let session = store.create_session(Some(user_id)).unwrap();
        assert_eq!(session.user_id, Some(user_id));
        assert!(store.get_session(&session.id).unwrap().is_some());

        store.delete_session(&session.id).unwrap();
        assert!(store.get_session(&session.id).unwrap().is_none());
    }

    #[test]
    fn test_flash_is_one_shot() {
        let (store, _dir) = create_test_store();
        let session = store.create_session(None).unwrap();

        let flash = Flash {
            kind: FlashKind::Success,
            message: "Saved".to_string(),
        };
        store.set_flash(&session.id, &flash).unwrap();

        assert_eq!(store.take_flash(&session.id).unwrap(), Some(flash));
        assert_eq!(store.take_flash(&session.id).unwrap(), None);
    }

    #[test]
    fn test_count_matches_list_for_filters() {
        let (store, _dir) = create_test_store();
        let owner = seed_user(&store, "owner@example.com");

        for (title, genre, condition) in [
            ("Dune", "Science Fiction", Condition::Good),
            ("Hyperion", "Science Fiction", Condition::Fair),
            ("Emma", "Fiction", Condition::New),
            ("Dracula", "Horror", Condition::Poor),
        ] {
            store.create_book(owner, &draft(title, genre, condition)).unwrap();
        }

        let filters = BookFilters {
            genre: Some("Science Fiction".to_string()),
            ..BookFilters::available()
        };
        let total = store.count_books(&filters).unwrap();
        let listed = store.list_books(&filters, total.max(1), 0).unwrap();
        assert_eq!(total, 2);
        assert_eq!(listed.len() as i64, total);
    }

    #[test]
    fn test_search_spans_all_text_fields() {
        let (store, _dir) = create_test_store();
        let owner = seed_user(&store, "owner@example.com");

        store.create_book(owner, &draft("Dune", "Science Fiction", Condition::Good)).unwrap();
        store.create_book(owner, &draft("Emma", "Fiction", Condition::Good)).unwrap();

        // Matches genre text, case-insensitively
        let filters = BookFilters {
            search: Some("science".to_string()),
            ..BookFilters::available()
        };
        assert_eq!(store.count_books(&filters).unwrap(), 1);

        // Matches the shared description
        let filters = BookFilters {
            search: Some("test listing".to_string()),
            ..BookFilters::available()
        };
        assert_eq!(store.count_books(&filters).unwrap(), 2);
    }

    #[test]
    fn test_condition_sort_ranks_best_first() {
        let (store, _dir) = create_test_store();
        let owner = seed_user(&store, "owner@example.com");

        store.create_book(owner, &draft("Worn", "Fiction", Condition::Poor)).unwrap();
        store.create_book(owner, &draft("Pristine", "Fiction", Condition::New)).unwrap();
        store.create_book(owner, &draft("Decent", "Fiction", Condition::Good)).unwrap();

        let filters = BookFilters {
            sort: SortOrder::Condition,
            ..BookFilters::available()
        };
        let books = store.list_books(&filters, 10, 0).unwrap();
        let titles: Vec<&str> = books.iter().map(|b| b.book.title.as_str()).collect();
        assert_eq!(titles, ["Pristine", "Decent", "Worn"]);
    }

    #[test]
    fn test_unavailable_books_excluded_from_catalog() {
        let (store, _dir) = create_test_store();
        let owner = seed_user(&store, "owner@example.com");

        let kept = store.create_book(owner, &draft("Kept", "Fiction", Condition::Good)).unwrap();
        let gone = store.create_book(owner, &draft("Gone", "Fiction", Condition::Good)).unwrap();
        store.set_book_status(gone, BookStatus::Exchanged).unwrap();

        let filters = BookFilters::available();
        let books = store.list_books(&filters, 10, 0).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].book.id, kept);

        // Admin listings see every status
        let all = BookFilters::default();
        assert_eq!(store.count_books(&all).unwrap(), 2);
    }

    #[test]
    fn test_wishlist_duplicate_add_rejected() {
        let (store, _dir) = create_test_store();
        let owner = seed_user(&store, "owner@example.com");
        let reader = seed_user(&store, "reader@example.com");
        let book = store.create_book(owner, &draft("Dune", "Science Fiction", Condition::Good)).unwrap();

        store.wishlist_add(reader, book).unwrap();
        let result = store.wishlist_add(reader, book);
        assert!(matches!(result, Err(ExchangeError::AlreadyInWishlist)));

        assert!(store.wishlist_has(reader, book).unwrap());
        store.wishlist_remove(reader, book).unwrap();
        assert!(!store.wishlist_has(reader, book).unwrap());
        // Removing again is fine
        store.wishlist_remove(reader, book).unwrap();
    }

    #[test]
    fn test_delete_user_cascades() {
        let (store, _dir) = create_test_store();
        let owner = seed_user(&store, "owner@example.com");
        let reader = seed_user(&store, "reader@example.com");
        let book = store.create_book(owner, &draft("Dune", "Science Fiction", Condition::Good)).unwrap();
        store.wishlist_add(reader, book).unwrap();
        let session = store.create_session(Some(owner)).unwrap();
        store
            .upsert_remember_token(owner, "tok", Utc::now() + chrono::Duration::days(30))
            .unwrap();

        store.delete_user(owner).unwrap();

        assert!(store.get_user(owner).unwrap().is_none());
        assert!(store.get_book(book).unwrap().is_none());
        assert!(store.get_session(&session.id).unwrap().is_none());
        assert!(store.get_remember_token("tok").unwrap().is_none());
        assert!(!store.wishlist_has(reader, book).unwrap());
    }

    #[test]
    fn test_genres_reflect_available_books() {
        let (store, _dir) = create_test_store();
        let owner = seed_user(&store, "owner@example.com");

        store.create_book(owner, &draft("A", "Horror", Condition::Good)).unwrap();
        store.create_book(owner, &draft("B", "Fiction", Condition::Good)).unwrap();
        let hidden = store.create_book(owner, &draft("C", "Poetry", Condition::Good)).unwrap();
        store.set_book_status(hidden, BookStatus::Pending).unwrap();

        assert_eq!(store.genres().unwrap(), vec!["Fiction", "Horror"]);
    }
}

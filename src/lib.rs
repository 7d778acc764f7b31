//! Community Book Exchange
//!
//! A JSON API for a community book-exchange site: accounts with
//! session and remember-me auth, a filtered/paginated catalog,
//! wishlists, and an admin surface.

pub mod config;
pub mod crypto;
pub mod error;
pub mod mailer;
pub mod routes;
pub mod state;
pub mod store;
pub mod upload;
pub mod validate;

pub use config::Config;
pub use error::ExchangeError;
pub use mailer::{ConsoleMailer, Mailer};
pub use state::AppState;
pub use store::{InMemoryStore, SqliteStore, Store};
pub use upload::{ImageStore, LocalImageStore};

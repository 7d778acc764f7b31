//! Server configuration

use std::path::PathBuf;

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Directory book cover images are written to
    pub upload_dir: PathBuf,

    /// Maximum accepted image size in bytes
    pub max_image_bytes: usize,

    /// Default page size for the public catalog
    pub books_per_page: i64,

    /// Page size for admin listings
    pub admin_items_per_page: i64,

    /// Whether cookies carry the Secure attribute
    pub secure_cookies: bool,
}

impl Config {
    /// Load configuration from `BOOKEX_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("BOOKEX_PORT", defaults.port),
            database_path: std::env::var("BOOKEX_DATABASE")
                .unwrap_or(defaults.database_path),
            upload_dir: std::env::var("BOOKEX_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_image_bytes: env_parse("BOOKEX_MAX_IMAGE_BYTES", defaults.max_image_bytes),
            books_per_page: env_parse("BOOKEX_BOOKS_PER_PAGE", defaults.books_per_page),
            admin_items_per_page: defaults.admin_items_per_page,
            secure_cookies: env_parse("BOOKEX_SECURE_COOKIES", defaults.secure_cookies),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_path: "book_exchange.db".to_string(),
            upload_dir: PathBuf::from("uploads"),
            max_image_bytes: 5 * 1024 * 1024,
            books_per_page: 9,
            admin_items_per_page: 10,
            secure_cookies: true,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

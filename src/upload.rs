//! Book cover upload handling
//!
//! Covers arrive as raw bytes, get sniffed for a supported image format,
//! and land in the upload directory under an unguessable name. The
//! placeholder URL covers listings without an image.

use std::fs;
use std::path::PathBuf;

use uuid::Uuid;

use crate::error::ExchangeError;

/// URL served when a listing has no cover image
pub const PLACEHOLDER_COVER_URL: &str = "/assets/book-placeholder.png";

/// Trait for storing and resolving uploaded cover images
pub trait ImageStore: Send + Sync {
    /// Persist image bytes; returns the stored filename.
    ///
    /// Fails with `FileTooLarge` past the size cap and `InvalidImageType`
    /// when the bytes aren't a supported image format.
    fn store(&self, data: &[u8], prefix: &str) -> Result<String, ExchangeError>;

    /// Delete a stored image; false when it was already gone
    fn delete(&self, filename: &str) -> bool;

    /// Public URL for a stored filename, or the placeholder
    fn url_for(&self, filename: Option<&str>) -> String {
        match filename {
            Some(name) => format!("/uploads/{name}"),
            None => PLACEHOLDER_COVER_URL.to_string(),
        }
    }
}

/// Sniff the image format from magic bytes; returns the file extension.
fn sniff_extension(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("png")
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some("gif")
    } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// Image store writing to a local directory
pub struct LocalImageStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl LocalImageStore {
    pub fn new(dir: PathBuf, max_bytes: usize) -> Self {
        Self { dir, max_bytes }
    }
}

impl ImageStore for LocalImageStore {
    fn store(&self, data: &[u8], prefix: &str) -> Result<String, ExchangeError> {
        if data.len() > self.max_bytes {
            return Err(ExchangeError::FileTooLarge);
        }
        let ext = sniff_extension(data).ok_or(ExchangeError::InvalidImageType)?;

        let filename = format!("{prefix}-{}.{ext}", Uuid::new_v4());
        fs::write(self.dir.join(&filename), data)?;
        Ok(filename)
    }

    fn delete(&self, filename: &str) -> bool {
        fs::remove_file(self.dir.join(filename)).is_ok()
    }
}

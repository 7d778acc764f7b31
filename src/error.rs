//! Exchange error types

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Field name -> human-readable message, for inline form display.
pub type ValidationErrors = BTreeMap<&'static str, String>;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Validation failed")]
    Validation(ValidationErrors),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account not verified")]
    AccountNotVerified,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Email not found")]
    EmailNotFound,

    #[error("Current password is incorrect")]
    WrongCurrentPassword,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Invalid CSRF token")]
    InvalidCsrf,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Book not available")]
    BookUnavailable,

    #[error("Book already in wishlist")]
    AlreadyInWishlist,

    #[error("File too large")]
    FileTooLarge,

    #[error("Unsupported image type")]
    InvalidImageType,

    #[error("Upload failed: {0}")]
    UploadIo(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ExchangeError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ExchangeError::Validation(errors) => {
                let body = json!({
                    "success": false,
                    "reason": "Validation failed",
                    "errors": errors,
                });
                return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response();
            }
            ExchangeError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password")
            }
            ExchangeError::AccountNotVerified => (
                StatusCode::FORBIDDEN,
                "Please verify your email address before logging in",
            ),
            ExchangeError::EmailTaken => (StatusCode::CONFLICT, "Email already registered"),
            ExchangeError::EmailNotFound => (StatusCode::NOT_FOUND, "Email not found"),
            ExchangeError::WrongCurrentPassword => {
                (StatusCode::BAD_REQUEST, "Current password is incorrect")
            }
            ExchangeError::InvalidResetToken => {
                (StatusCode::BAD_REQUEST, "Invalid or expired reset token")
            }
            ExchangeError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            ExchangeError::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
            ExchangeError::InvalidCsrf => (StatusCode::FORBIDDEN, "Invalid CSRF token"),
            ExchangeError::NotFound(what) => {
                return (
                    StatusCode::NOT_FOUND,
                    axum::Json(json!({
                        "success": false,
                        "reason": format!("{what} not found"),
                    })),
                )
                    .into_response();
            }
            ExchangeError::BookUnavailable => (StatusCode::CONFLICT, "Book not available"),
            ExchangeError::AlreadyInWishlist => {
                (StatusCode::CONFLICT, "Book already in wishlist")
            }
            ExchangeError::FileTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "File too large"),
            ExchangeError::InvalidImageType => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported image type")
            }
            ExchangeError::UploadIo(err) => {
                tracing::error!("Upload I/O error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            ExchangeError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            ExchangeError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "reason": message });
        (status, axum::Json(body)).into_response()
    }
}

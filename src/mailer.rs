//! Outbound mail abstractions
//!
//! Real delivery is out of scope; the console sender logs what would
//! have been sent so flows that hand out tokens stay testable.

use crate::error::ExchangeError;

/// Trait for sending account emails
pub trait Mailer: Send + Sync {
    /// Send an email verification token
    fn send_verification(&self, email: &str, token: &str) -> Result<(), String>;

    /// Send a password reset token
    fn send_password_reset(&self, email: &str, token: &str) -> Result<(), String>;
}

/// Mailer that writes messages to the log instead of sending them
pub struct ConsoleMailer;

impl ConsoleMailer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailer for ConsoleMailer {
    fn send_verification(&self, email: &str, token: &str) -> Result<(), String> {
        tracing::info!(email, token, "verification email (console)");
        Ok(())
    }

    fn send_password_reset(&self, email: &str, token: &str) -> Result<(), String> {
        tracing::info!(email, token, "password reset email (console)");
        Ok(())
    }
}

/// Convert a mailer failure into a request-fatal error
pub fn mail_error(e: String) -> ExchangeError {
    ExchangeError::Internal(format!("mail delivery failed: {e}"))
}

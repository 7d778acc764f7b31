//! Field-level input validation
//!
//! Validators accumulate a field -> message map so forms can show every
//! problem at once instead of failing on the first.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ExchangeError, ValidationErrors};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

/// Characters accepted as the "special character" in a password
const PASSWORD_SPECIALS: &str = "@$!%*?&";

pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// At least 8 characters with an uppercase letter, a digit, and a
/// special character.
pub fn valid_password(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

const PASSWORD_RULES: &str =
    "Password must contain at least 8 characters, one uppercase letter, one number, and one special character";

/// Return the accumulated errors as a request error, or pass
pub fn finish(errors: ValidationErrors) -> Result<(), ExchangeError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ExchangeError::Validation(errors))
    }
}

pub fn registration(name: &str, email: &str, password: &str) -> Result<(), ExchangeError> {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, name);
    check_email(&mut errors, email);
    if password.is_empty() {
        errors.insert("password", "Password is required".to_string());
    } else if !valid_password(password) {
        errors.insert("password", PASSWORD_RULES.to_string());
    }
    finish(errors)
}

pub fn new_password(password: &str) -> Result<(), ExchangeError> {
    let mut errors = ValidationErrors::new();
    if !valid_password(password) {
        errors.insert("new_password", PASSWORD_RULES.to_string());
    }
    finish(errors)
}

pub fn profile(name: &str) -> Result<(), ExchangeError> {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, name);
    finish(errors)
}

pub fn contact(
    name: &str,
    email: &str,
    subject: &str,
    message: &str,
) -> Result<(), ExchangeError> {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, name);
    check_email(&mut errors, email);
    if subject.trim().is_empty() {
        errors.insert("subject", "Subject is required".to_string());
    }
    if message.trim().is_empty() {
        errors.insert("message", "Message is required".to_string());
    }
    finish(errors)
}

/// Validate the text fields of a book draft. Condition and exchange
/// type are parsed separately since they are closed enums.
pub fn book_fields(
    title: &str,
    author: &str,
    genre: &str,
    description: &str,
    year_published: Option<i32>,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if title.trim().is_empty() {
        errors.insert("title", "Title is required".to_string());
    }
    if author.trim().is_empty() {
        errors.insert("author", "Author is required".to_string());
    }
    if genre.trim().is_empty() {
        errors.insert("genre", "Genre is required".to_string());
    }
    if description.trim().is_empty() {
        errors.insert("description", "Description is required".to_string());
    }
    if let Some(year) = year_published {
        if !(1000..=2100).contains(&year) {
            errors.insert("year_published", "Enter a valid publication year".to_string());
        }
    }
    errors
}

fn check_name(errors: &mut ValidationErrors, name: &str) {
    let name = name.trim();
    if name.is_empty() {
        errors.insert("name", "Name is required".to_string());
    } else if name.len() < 2 {
        errors.insert("name", "Name must be at least 2 characters".to_string());
    }
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    let email = email.trim();
    if email.is_empty() {
        errors.insert("email", "Email is required".to_string());
    } else if !valid_email(email) {
        errors.insert("email", "Please enter a valid email address".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_format() {
        assert!(valid_email("alice@example.com"));
        assert!(valid_email("a.b+c@sub.example.org"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing@tld"));
        assert!(!valid_email("spaces in@example.com"));
    }

    #[test]
    fn test_password_policy() {
        assert!(valid_password("Abc12345!"));
        assert!(valid_password("Str0ng&Password"));
        assert!(!valid_password("short1!"));
        assert!(!valid_password("alllowercase1!"));
        assert!(!valid_password("NoDigitsHere!"));
        assert!(!valid_password("NoSpecial123"));
    }

    #[test]
    fn test_registration_collects_all_errors() {
        let err = registration("", "bad-email", "weak").unwrap_err();
        match err {
            ExchangeError::Validation(errors) => {
                assert!(errors.contains_key("name"));
                assert!(errors.contains_key("email"));
                assert!(errors.contains_key("password"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_book_fields() {
        let errors = book_fields("Dune", "Frank Herbert", "Science Fiction", "Spice", Some(1965));
        assert!(errors.is_empty());

        let errors = book_fields("", "", "Fiction", "x", Some(99));
        assert!(errors.contains_key("title"));
        assert!(errors.contains_key("author"));
        assert!(errors.contains_key("year_published"));
    }
}

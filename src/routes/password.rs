//! Password change and reset endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::crypto::{generate_token, hash_password, verify_password};
use crate::error::ExchangeError;
use crate::mailer::{mail_error, Mailer};
use crate::state::AppState;
use crate::store::{Store, UserStore};
use crate::upload::ImageStore;
use crate::validate;

use super::session::{mutating_session, mutating_user};

/// Reset token lifetime in minutes
const RESET_TOKEN_MINUTES: i64 = 60;

#[derive(Serialize)]
pub struct PasswordResponse {
    pub success: bool,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub csrf_token: String,
}

/// POST /api/password/change
pub async fn change_password<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<PasswordResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (_, user) = mutating_user(&state.store, &cookies, &req.csrf_token)?;

    let valid = verify_password(&req.current_password, &user.password_hash)
        .map_err(|e| ExchangeError::Internal(e.to_string()))?;
    if !valid {
        return Err(ExchangeError::WrongCurrentPassword);
    }

    validate::new_password(&req.new_password)?;

    let new_hash =
        hash_password(&req.new_password).map_err(|e| ExchangeError::Internal(e.to_string()))?;
    state.store.update_password(user.id, &new_hash)?;

    Ok(Json(PasswordResponse { success: true }))
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
    pub csrf_token: String,
}

/// POST /api/password/forgot
///
/// Issues a single-use reset token with a one-hour expiry and hands it
/// to the mailer.
pub async fn forgot_password<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<PasswordResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    mutating_session(&state.store, &cookies, &req.csrf_token)?;

    let user = state
        .store
        .get_user_by_email(&req.email)?
        .ok_or(ExchangeError::EmailNotFound)?;

    let token = generate_token();
    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_MINUTES);
    state.store.set_reset_token(user.id, &token, expires_at)?;

    state
        .mailer
        .send_password_reset(&user.email, &token)
        .map_err(mail_error)?;

    Ok(Json(PasswordResponse { success: true }))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub csrf_token: String,
}

/// POST /api/password/reset
pub async fn reset_password<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<PasswordResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    mutating_session(&state.store, &cookies, &req.csrf_token)?;

    validate::new_password(&req.new_password)?;

    let user = state
        .store
        .get_user_by_reset_token(&req.token)?
        .ok_or(ExchangeError::InvalidResetToken)?;

    let expired = match user.reset_token_expiry {
        Some(expiry) => expiry < Utc::now(),
        None => true,
    };
    if expired {
        state.store.clear_reset_token(user.id)?;
        return Err(ExchangeError::InvalidResetToken);
    }

    let new_hash =
        hash_password(&req.new_password).map_err(|e| ExchangeError::Internal(e.to_string()))?;
    state.store.update_password(user.id, &new_hash)?;

    // Tokens are single-use
    state.store.clear_reset_token(user.id)?;

    Ok(Json(PasswordResponse { success: true }))
}

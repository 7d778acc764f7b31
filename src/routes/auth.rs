//! Registration, login, and logout endpoints

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
use crate::store::{NewUser, SessionStore, Store, UserStore};
use crate::upload::ImageStore;
use crate::validate;

use super::session::{
    clear_remember_cookie, clear_session_cookie, mutating_session, session_from_cookies,
    set_remember_cookie, set_session_cookie, validate_csrf, UserInfo, REMEMBER_COOKIE,
    REMEMBER_DAYS,
};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub csrf_token: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub user_id: i64,
}

/// POST /api/register
pub async fn register<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    mutating_session(&state.store, &cookies, &req.csrf_token)?;

    validate::registration(&req.name, &req.email, &req.password)?;

    let email = req.email.trim().to_lowercase();
    if state.store.get_user_by_email(&email)?.is_some() {
        return Err(ExchangeError::EmailTaken);
    }

    let password_hash =
        hash_password(&req.password).map_err(|e| ExchangeError::Internal(e.to_string()))?;
    let verification_token = generate_token();

    let user_id = state.store.create_user(NewUser {
        name: req.name.trim().to_string(),
        email: email.clone(),
        password_hash,
        verification_token: Some(verification_token.clone()),
    })?;

    state
        .mailer
        .send_verification(&email, &verification_token)
        .map_err(mail_error)?;

    // Delivery is stubbed, so accounts verify immediately
    state.store.verify_email(&email)?;

    Ok(Json(RegisterResponse {
        success: true,
        user_id: user_id.0,
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
    pub csrf_token: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserInfo,
    /// CSRF secret of the post-login session
    pub csrf_token: String,
}

/// POST /api/login
pub async fn login<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let session = mutating_session(&state.store, &cookies, &req.csrf_token)?;

    let user = state
        .store
        .get_user_by_email(&req.email)?
        .ok_or(ExchangeError::InvalidCredentials)?;

    let valid = verify_password(&req.password, &user.password_hash)
        .map_err(|e| ExchangeError::Internal(e.to_string()))?;
    if !valid {
        return Err(ExchangeError::InvalidCredentials);
    }

    if !user.email_verified {
        return Err(ExchangeError::AccountNotVerified);
    }

    // Replace the pre-auth session outright so the login gets a fresh
    // session id and CSRF secret
    state.store.delete_session(&session.id)?;
    let session = state.store.create_session(Some(user.id))?;
    set_session_cookie(&cookies, &session.id.0, state.config.secure_cookies);

    state.store.update_last_login(user.id)?;

    if req.remember {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::days(REMEMBER_DAYS);
        state
            .store
            .upsert_remember_token(user.id, &token, expires_at)?;
        set_remember_cookie(&cookies, &token, state.config.secure_cookies);
    }

    Ok(Json(LoginResponse {
        success: true,
        user: UserInfo::from_user(&user),
        csrf_token: session.csrf_token,
    }))
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub csrf_token: String,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// POST /api/logout
pub async fn logout<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    if let Some(session) = session_from_cookies(&cookies, &state.store)? {
        validate_csrf(&session, &req.csrf_token)?;
        state.store.delete_session(&session.id)?;
    }

    if let Some(cookie) = cookies.get(REMEMBER_COOKIE) {
        let token = cookie.value().to_string();
        state.store.delete_remember_token(&token)?;
        clear_remember_cookie(&cookies);
    }

    clear_session_cookie(&cookies);

    Ok(Json(LogoutResponse { success: true }))
}

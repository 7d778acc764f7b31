//! Session context endpoint, cookie helpers, and auth guards

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::crypto::constant_time_eq;
use crate::error::ExchangeError;
use crate::mailer::Mailer;
use crate::state::AppState;
use crate::store::{
    Flash, Role, Session, SessionId, SessionStore, Store, StoreResult, User, UserStore,
};
use crate::upload::ImageStore;

pub const SESSION_COOKIE: &str = "bookex_session";
pub const REMEMBER_COOKIE: &str = "bookex_remember";

/// Remember-me token lifetime
pub const REMEMBER_DAYS: i64 = 30;

/// Public view of the logged-in user
#[derive(Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl UserInfo {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.0,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            location: user.location.clone(),
            bio: user.bio.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct SessionContext {
    pub authenticated: bool,
    pub csrf_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
    pub server_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

/// GET /api/session
///
/// First contact issues an anonymous session so the client holds a CSRF
/// token before it submits anything. Also the flash consumption point.
pub async fn session_context<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
) -> Result<Json<SessionContext>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let secure = state.config.secure_cookies;

    let (session, user) = match authenticate(&state, &cookies)? {
        Some((session, user)) => (session, Some(user)),
        None => {
            let session = match session_from_cookies(&cookies, &state.store)? {
                Some(session) => session,
                None => {
                    let session = state.store.create_session(None)?;
                    set_session_cookie(&cookies, &session.id.0, secure);
                    session
                }
            };
            (session, None)
        }
    };

    let flash = state.store.take_flash(&session.id)?;

    Ok(Json(SessionContext {
        authenticated: user.is_some(),
        csrf_token: session.csrf_token,
        user: user.as_ref().map(UserInfo::from_user),
        server_time: Utc::now().timestamp(),
        flash,
    }))
}

/// Current session per the session cookie, if the row still exists
pub fn session_from_cookies<S: SessionStore>(
    cookies: &Cookies,
    store: &S,
) -> StoreResult<Option<Session>> {
    match cookies.get(SESSION_COOKIE) {
        Some(cookie) => {
            let session_id = SessionId(cookie.value().to_string());
            store.get_session(&session_id)
        }
        None => Ok(None),
    }
}

/// Resolve the caller: the session cookie first, then silent re-auth
/// through the remember-me cookie. An expired or orphaned remember
/// token fails closed: the row and cookie are dropped.
pub fn authenticate<S, I, M>(
    state: &AppState<S, I, M>,
    cookies: &Cookies,
) -> StoreResult<Option<(Session, User)>>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let secure = state.config.secure_cookies;

    if let Some(session) = session_from_cookies(cookies, &state.store)? {
        if let Some(user_id) = session.user_id {
            if let Some(user) = state.store.get_user(user_id)? {
                return Ok(Some((session, user)));
            }
            // Account is gone; the session is useless
            state.store.delete_session(&session.id)?;
            clear_session_cookie(cookies);
        }
    }

    let Some(cookie) = cookies.get(REMEMBER_COOKIE) else {
        return Ok(None);
    };
    let token_value = cookie.value().to_string();

    let Some(token) = state.store.get_remember_token(&token_value)? else {
        clear_remember_cookie(cookies);
        return Ok(None);
    };

    if token.expires_at < Utc::now() {
        state.store.delete_remember_token(&token_value)?;
        clear_remember_cookie(cookies);
        return Ok(None);
    }

    let Some(user) = state.store.get_user(token.user_id)? else {
        state.store.delete_remember_token(&token_value)?;
        clear_remember_cookie(cookies);
        return Ok(None);
    };

    // Re-establish the session and push the token expiry forward
    let session = state.store.create_session(Some(user.id))?;
    set_session_cookie(cookies, &session.id.0, secure);

    let new_expiry = Utc::now() + Duration::days(REMEMBER_DAYS);
    state.store.extend_remember_token(&token_value, new_expiry)?;
    set_remember_cookie(cookies, &token_value, secure);

    state.store.update_last_login(user.id)?;

    Ok(Some((session, user)))
}

/// Guard: the caller must be logged in
pub fn require_user<S, I, M>(
    state: &AppState<S, I, M>,
    cookies: &Cookies,
) -> Result<(Session, User), ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    authenticate(state, cookies)?.ok_or(ExchangeError::NotAuthenticated)
}

/// Guard: the caller must be an admin
pub fn require_admin<S, I, M>(
    state: &AppState<S, I, M>,
    cookies: &Cookies,
) -> Result<(Session, User), ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (session, user) = require_user(state, cookies)?;
    if user.role != Role::Admin {
        return Err(ExchangeError::Forbidden);
    }
    Ok((session, user))
}

/// Compare a submitted CSRF token against the session's secret
pub fn validate_csrf(session: &Session, candidate: &str) -> Result<(), ExchangeError> {
    if constant_time_eq(&session.csrf_token, candidate) {
        Ok(())
    } else {
        Err(ExchangeError::InvalidCsrf)
    }
}

/// Mutating-request guard for endpoints open to anonymous callers:
/// a session must exist and its CSRF token must match, checked before
/// the handler touches anything.
pub fn mutating_session<S: Store>(
    store: &S,
    cookies: &Cookies,
    csrf_token: &str,
) -> Result<Session, ExchangeError> {
    let session = session_from_cookies(cookies, store)?.ok_or(ExchangeError::InvalidCsrf)?;
    validate_csrf(&session, csrf_token)?;
    Ok(session)
}

/// Mutating-request guard for logged-in callers. Silent remember-me
/// re-auth does not apply here: the CSRF secret belongs to the session,
/// so a caller without one has to refresh the session context first.
pub fn mutating_user<S: Store>(
    store: &S,
    cookies: &Cookies,
    csrf_token: &str,
) -> Result<(Session, User), ExchangeError> {
    let session = session_from_cookies(cookies, store)?.ok_or(ExchangeError::NotAuthenticated)?;
    validate_csrf(&session, csrf_token)?;
    let user_id = session.user_id.ok_or(ExchangeError::NotAuthenticated)?;
    let user = store
        .get_user(user_id)?
        .ok_or(ExchangeError::NotAuthenticated)?;
    Ok((session, user))
}

/// Mutating-request guard for admins
pub fn mutating_admin<S: Store>(
    store: &S,
    cookies: &Cookies,
    csrf_token: &str,
) -> Result<(Session, User), ExchangeError> {
    let (session, user) = mutating_user(store, cookies, csrf_token)?;
    if user.role != Role::Admin {
        return Err(ExchangeError::Forbidden);
    }
    Ok((session, user))
}

/// Helper to set the session cookie
pub fn set_session_cookie(cookies: &Cookies, session_id: &str, secure: bool) {
    use tower_cookies::Cookie;
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .build();
    cookies.add(cookie);
}

/// Helper to clear the session cookie
pub fn clear_session_cookie(cookies: &Cookies) {
    use tower_cookies::Cookie;
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(tower_cookies::cookie::time::Duration::ZERO)
        .build();
    cookies.add(cookie);
}

/// Helper to set the remember-me cookie
pub fn set_remember_cookie(cookies: &Cookies, token: &str, secure: bool) {
    use tower_cookies::Cookie;
    let cookie = Cookie::build((REMEMBER_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .max_age(tower_cookies::cookie::time::Duration::days(REMEMBER_DAYS))
        .build();
    cookies.add(cookie);
}

/// Helper to clear the remember-me cookie
pub fn clear_remember_cookie(cookies: &Cookies) {
    use tower_cookies::Cookie;
    let cookie = Cookie::build((REMEMBER_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(tower_cookies::cookie::time::Duration::ZERO)
        .build();
    cookies.add(cookie);
}

/// One-shot success notice on the caller's session
pub fn flash_success<S: SessionStore>(
    store: &S,
    session: &Session,
    message: &str,
) -> StoreResult<()> {
    store.set_flash(
        &session.id,
        &Flash {
            kind: crate::store::FlashKind::Success,
            message: message.to_string(),
        },
    )
}

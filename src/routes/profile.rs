//! Profile endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::error::ExchangeError;
use crate::mailer::Mailer;
use crate::state::AppState;
use crate::store::{ProfileUpdate, Store, UserStore};
use crate::upload::ImageStore;
use crate::validate;

use super::session::{mutating_user, require_user, UserInfo};

#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: UserInfo,
    pub member_since: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/// GET /api/profile
pub async fn profile<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
) -> Result<Json<ProfileResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (_, user) = require_user(&state, &cookies)?;

    Ok(Json(ProfileResponse {
        user: UserInfo::from_user(&user),
        member_since: user.created_at,
        last_login: user.last_login,
    }))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub csrf_token: String,
}

#[derive(Serialize)]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub user: UserInfo,
}

/// PUT /api/profile
pub async fn update_profile<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (_, user) = mutating_user(&state.store, &cookies, &req.csrf_token)?;

    validate::profile(&req.name)?;

    let update = ProfileUpdate {
        name: req.name.trim().to_string(),
        location: req
            .location
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
        bio: req
            .bio
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
    };
    state.store.update_profile(user.id, &update)?;

    let user = state
        .store
        .get_user(user.id)?
        .ok_or(ExchangeError::NotFound("User"))?;

    Ok(Json(UpdateProfileResponse {
        success: true,
        user: UserInfo::from_user(&user),
    }))
}

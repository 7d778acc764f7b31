//! Public contact form endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::error::ExchangeError;
use crate::mailer::Mailer;
use crate::state::AppState;
use crate::store::{ContactStore, NewMessage, Store};
use crate::upload::ImageStore;
use crate::validate;

use super::session::{flash_success, mutating_session};

#[derive(Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub csrf_token: String,
}

#[derive(Serialize)]
pub struct ContactResponse {
    pub success: bool,
}

/// POST /api/contact
pub async fn submit<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Json(req): Json<ContactRequest>,
) -> Result<Json<ContactResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let session = mutating_session(&state.store, &cookies, &req.csrf_token)?;

    validate::contact(&req.name, &req.email, &req.subject, &req.message)?;

    state.store.create_message(&NewMessage {
        name: req.name.trim().to_string(),
        email: req.email.trim().to_string(),
        subject: req.subject.trim().to_string(),
        message: req.message.trim().to_string(),
    })?;

    flash_success(
        &state.store,
        &session,
        "Thanks for your message! We'll get back to you soon.",
    )?;

    Ok(Json(ContactResponse { success: true }))
}

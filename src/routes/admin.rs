//! Admin endpoints: dashboard numbers, user management, catalog
//! moderation, and the contact inbox

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::error::{ExchangeError, ValidationErrors};
use crate::mailer::Mailer;
use crate::state::AppState;
use crate::store::{
    BookFilters, BookStatistics, BookStatus, BookStore, ContactMessage, ContactStore,
    MessageStatus, Role, SortOrder, Store, UserId, UserStore,
};
use crate::upload::ImageStore;

use super::books::{clamp_page, listing_payload, BookPayload};
use super::session::{mutating_admin, require_admin};

#[derive(Serialize)]
pub struct AdminStatsResponse {
    pub books: BookStatistics,
    pub total_users: i64,
    pub unread_messages: i64,
}

/// GET /api/admin/stats
pub async fn stats<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
) -> Result<Json<AdminStatsResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    require_admin(&state, &cookies)?;

    Ok(Json(AdminStatsResponse {
        books: state.store.statistics()?,
        total_users: state.store.count_users()?,
        unread_messages: state.store.count_messages(Some(MessageStatus::Unread))?,
    }))
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

/// GET /api/admin/users
pub async fn list_users<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserListResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    require_admin(&state, &cookies)?;

    let per_page = state.config.admin_items_per_page;
    let total = state.store.count_users()?;
    let (page, total_pages, offset) = clamp_page(total, per_page, query.page.unwrap_or(1));

    let users = state
        .store
        .list_users(per_page, offset)?
        .iter()
        .map(|user| UserSummary {
            id: user.id.0,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: user.created_at,
            last_login: user.last_login,
        })
        .collect();

    Ok(Json(UserListResponse {
        users,
        total,
        page,
        total_pages,
    }))
}

#[derive(Deserialize)]
pub struct AdminActionRequest {
    pub csrf_token: String,
}

#[derive(Serialize)]
pub struct AdminActionResponse {
    pub success: bool,
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Path(id): Path<i64>,
    Json(req): Json<AdminActionRequest>,
) -> Result<Json<AdminActionResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (_, admin) = mutating_admin(&state.store, &cookies, &req.csrf_token)?;

    let target = UserId(id);
    if target == admin.id {
        return Err(ExchangeError::Forbidden);
    }
    state
        .store
        .get_user(target)?
        .ok_or(ExchangeError::NotFound("User"))?;

    state.store.delete_user(target)?;

    Ok(Json(AdminActionResponse { success: true }))
}

#[derive(Deserialize)]
pub struct AdminBooksQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
}

#[derive(Serialize)]
pub struct AdminBooksResponse {
    pub books: Vec<BookPayload>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

/// GET /api/admin/books
///
/// Unlike the public catalog this sees every status; an explicit
/// `status` filter narrows it.
pub async fn list_books<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Query(query): Query<AdminBooksQuery>,
) -> Result<Json<AdminBooksResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    require_admin(&state, &cookies)?;

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(value) => Some(BookStatus::from_str(value).ok_or_else(|| {
            let mut errors = ValidationErrors::new();
            errors.insert("status", format!("Unknown status: {value}"));
            ExchangeError::Validation(errors)
        })?),
        None => None,
    };

    let filters = BookFilters {
        status,
        sort: SortOrder::Newest,
        ..BookFilters::default()
    };

    let per_page = state.config.admin_items_per_page;
    let total = state.store.count_books(&filters)?;
    let (page, total_pages, offset) = clamp_page(total, per_page, query.page.unwrap_or(1));

    let books = state
        .store
        .list_books(&filters, per_page, offset)?
        .iter()
        .map(|listing| listing_payload(&state.images, listing))
        .collect();

    Ok(Json(AdminBooksResponse {
        books,
        total,
        page,
        total_pages,
    }))
}

#[derive(Deserialize)]
pub struct MessagesQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
}

#[derive(Serialize)]
pub struct MessagePayload {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl MessagePayload {
    fn from_message(message: &ContactMessage) -> Self {
        Self {
            id: message.id,
            name: message.name.clone(),
            email: message.email.clone(),
            subject: message.subject.clone(),
            message: message.message.clone(),
            status: message.status,
            created_at: message.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<MessagePayload>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

/// GET /api/admin/messages
pub async fn list_messages<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessageListResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    require_admin(&state, &cookies)?;

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(value) => Some(MessageStatus::from_str(value).ok_or_else(|| {
            let mut errors = ValidationErrors::new();
            errors.insert("status", format!("Unknown status: {value}"));
            ExchangeError::Validation(errors)
        })?),
        None => None,
    };

    let per_page = state.config.admin_items_per_page;
    let total = state.store.count_messages(status)?;
    let (page, total_pages, offset) = clamp_page(total, per_page, query.page.unwrap_or(1));

    let messages = state
        .store
        .list_messages(status, per_page, offset)?
        .iter()
        .map(MessagePayload::from_message)
        .collect();

    Ok(Json(MessageListResponse {
        messages,
        total,
        page,
        total_pages,
    }))
}

#[derive(Deserialize)]
pub struct MessageStatusRequest {
    pub status: String,
    pub csrf_token: String,
}

/// POST /api/admin/messages/{id}/status
pub async fn set_message_status<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Path(id): Path<i64>,
    Json(req): Json<MessageStatusRequest>,
) -> Result<Json<AdminActionResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    mutating_admin(&state.store, &cookies, &req.csrf_token)?;

    let status = MessageStatus::from_str(&req.status).ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.insert("status", format!("Unknown status: {}", req.status));
        ExchangeError::Validation(errors)
    })?;

    state.store.set_message_status(id, status)?;

    Ok(Json(AdminActionResponse { success: true }))
}

/// DELETE /api/admin/messages/{id}
pub async fn delete_message<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Path(id): Path<i64>,
    Json(req): Json<AdminActionRequest>,
) -> Result<Json<AdminActionResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    mutating_admin(&state.store, &cookies, &req.csrf_token)?;

    state.store.delete_message(id)?;

    Ok(Json(AdminActionResponse { success: true }))
}

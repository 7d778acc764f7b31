//! Wishlist endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::error::ExchangeError;
use crate::mailer::Mailer;
use crate::state::AppState;
use crate::store::{BookId, BookStatus, BookStore, Store, UserId, WishlistStore};
use crate::upload::ImageStore;

use super::books::{listing_payload, BookPayload};
use super::session::{mutating_user, require_user};

#[derive(Serialize)]
pub struct WishlistEntryPayload {
    #[serde(flatten)]
    pub book: BookPayload,
    pub added_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct WishlistResponse {
    pub items: Vec<WishlistEntryPayload>,
    pub count: i64,
}

/// GET /api/wishlist
pub async fn list_wishlist<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
) -> Result<Json<WishlistResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (_, user) = require_user(&state, &cookies)?;

    let items = state
        .store
        .wishlist_for_user(user.id)?
        .iter()
        .map(|item| WishlistEntryPayload {
            book: listing_payload(&state.images, &item.listing),
            added_at: item.added_at,
        })
        .collect();
    let count = state.store.wishlist_count(user.id)?;

    Ok(Json(WishlistResponse { items, count }))
}

#[derive(Deserialize)]
pub struct WishlistRequest {
    pub book_id: i64,
    pub csrf_token: String,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub success: bool,
    pub action: &'static str,
    pub in_wishlist: bool,
}

/// Shared add path: the book must exist and still be available.
fn add_to_wishlist<S: Store>(
    store: &S,
    user_id: UserId,
    book_id: BookId,
) -> Result<(), ExchangeError> {
    let listing = store
        .get_book(book_id)?
        .ok_or(ExchangeError::NotFound("Book"))?;
    if listing.book.status != BookStatus::Available {
        return Err(ExchangeError::BookUnavailable);
    }
    store.wishlist_add(user_id, book_id)
}

/// POST /api/wishlist/toggle
///
/// One existence check, then dispatch. A duplicate add losing a race
/// surfaces as `AlreadyInWishlist` from the store's unique constraint.
pub async fn toggle<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Json(req): Json<WishlistRequest>,
) -> Result<Json<ToggleResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (_, user) = mutating_user(&state.store, &cookies, &req.csrf_token)?;
    let book_id = BookId(req.book_id);

    if state.store.wishlist_has(user.id, book_id)? {
        state.store.wishlist_remove(user.id, book_id)?;
        Ok(Json(ToggleResponse {
            success: true,
            action: "removed",
            in_wishlist: false,
        }))
    } else {
        add_to_wishlist(&state.store, user.id, book_id)?;
        Ok(Json(ToggleResponse {
            success: true,
            action: "added",
            in_wishlist: true,
        }))
    }
}

#[derive(Serialize)]
pub struct WishlistActionResponse {
    pub success: bool,
}

/// POST /api/wishlist/add
pub async fn add<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Json(req): Json<WishlistRequest>,
) -> Result<Json<WishlistActionResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (_, user) = mutating_user(&state.store, &cookies, &req.csrf_token)?;
    add_to_wishlist(&state.store, user.id, BookId(req.book_id))?;
    Ok(Json(WishlistActionResponse { success: true }))
}

/// POST /api/wishlist/remove
///
/// Unconditional delete; removing an absent entry still succeeds.
pub async fn remove<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Json(req): Json<WishlistRequest>,
) -> Result<Json<WishlistActionResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (_, user) = mutating_user(&state.store, &cookies, &req.csrf_token)?;
    state
        .store
        .wishlist_remove(user.id, BookId(req.book_id))?;
    Ok(Json(WishlistActionResponse { success: true }))
}

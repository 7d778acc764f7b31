//! Catalog browsing and book CRUD endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::error::{ExchangeError, ValidationErrors};
use crate::mailer::Mailer;
use crate::state::AppState;
use crate::store::{
    Book, BookDraft, BookFilters, BookId, BookStatus, BookStore, BookWithOwner, Condition,
    ExchangeType, Role, SortOrder, Store, WishlistStore,
};
use crate::upload::ImageStore;
use crate::validate;

use super::session::{authenticate, flash_success, mutating_user, require_user};

/// How many books the home page strip shows
const FEATURED_COUNT: i64 = 3;

/// JSON view of a catalog entry
#[derive(Serialize)]
pub struct BookPayload {
    pub id: i64,
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub genre: String,
    pub condition: Condition,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_published: Option<i32>,
    pub exchange_type: ExchangeType,
    pub status: BookStatus,
    pub cover_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_location: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub(crate) fn book_payload<I: ImageStore>(
    images: &I,
    book: &Book,
    owner_name: Option<String>,
    owner_location: Option<String>,
) -> BookPayload {
    BookPayload {
        id: book.id.0,
        title: book.title.clone(),
        author: book.author.clone(),
        isbn: book.isbn.clone(),
        genre: book.genre.clone(),
        condition: book.condition,
        description: book.description.clone(),
        year_published: book.year_published,
        exchange_type: book.exchange_type,
        status: book.status,
        cover_url: images.url_for(book.image_file.as_deref()),
        owner_name,
        owner_location,
        created_at: book.created_at,
    }
}

pub(crate) fn listing_payload<I: ImageStore>(images: &I, listing: &BookWithOwner) -> BookPayload {
    book_payload(
        images,
        &listing.book,
        listing.owner_name.clone(),
        listing.owner_location.clone(),
    )
}

/// Clamp a 1-indexed page into the valid range for `total` rows.
/// Out-of-range pages land on the nearest valid page instead of erroring.
pub(crate) fn clamp_page(total: i64, per_page: i64, requested: i64) -> (i64, i64, i64) {
    let total_pages = ((total + per_page - 1) / per_page).max(1);
    let page = requested.clamp(1, total_pages);
    let offset = (page - 1) * per_page;
    (page, total_pages, offset)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub genre: Option<String>,
    #[serde(alias = "state")]
    pub condition: Option<String>,
    pub exchange_type: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl CatalogQuery {
    /// Turn loose query strings into typed filters. Unknown condition or
    /// exchange-type values are rejected with a field error; an unknown
    /// sort value falls back to the default order.
    pub(crate) fn into_filters(self) -> Result<BookFilters, ExchangeError> {
        let mut errors = ValidationErrors::new();

        let condition = match non_empty(self.condition) {
            Some(value) => match Condition::from_str(&value) {
                Some(condition) => Some(condition),
                None => {
                    errors.insert("condition", format!("Unknown condition: {value}"));
                    None
                }
            },
            None => None,
        };

        let exchange_type = match non_empty(self.exchange_type) {
            Some(value) => match ExchangeType::from_str(&value) {
                Some(exchange_type) => Some(exchange_type),
                None => {
                    errors.insert("exchange_type", format!("Unknown exchange type: {value}"));
                    None
                }
            },
            None => None,
        };

        validate::finish(errors)?;

        Ok(BookFilters {
            search: non_empty(self.search),
            genre: non_empty(self.genre),
            condition,
            exchange_type,
            status: Some(BookStatus::Available),
            sort: self
                .sort
                .as_deref()
                .map(SortOrder::from_param)
                .unwrap_or_default(),
        })
    }
}

#[derive(Serialize)]
pub struct CatalogResponse {
    pub books: Vec<BookPayload>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// GET /api/books
pub async fn list_books<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let requested_page = query.page.unwrap_or(1);
    let per_page = query
        .per_page
        .unwrap_or(state.config.books_per_page)
        .clamp(1, 100);
    let filters = query.into_filters()?;

    let total = state.store.count_books(&filters)?;
    let (page, total_pages, offset) = clamp_page(total, per_page, requested_page);

    let books = state
        .store
        .list_books(&filters, per_page, offset)?
        .iter()
        .map(|listing| listing_payload(&state.images, listing))
        .collect();

    Ok(Json(CatalogResponse {
        books,
        total,
        page,
        per_page,
        total_pages,
    }))
}

#[derive(Serialize)]
pub struct FeaturedResponse {
    pub books: Vec<BookPayload>,
}

/// GET /api/books/featured
pub async fn featured_books<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
) -> Result<Json<FeaturedResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let books = state
        .store
        .list_books(&BookFilters::available(), FEATURED_COUNT, 0)?
        .iter()
        .map(|listing| listing_payload(&state.images, listing))
        .collect();
    Ok(Json(FeaturedResponse { books }))
}

#[derive(Serialize)]
pub struct GenresResponse {
    pub genres: Vec<String>,
}

/// GET /api/genres
pub async fn genres<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
) -> Result<Json<GenresResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    Ok(Json(GenresResponse {
        genres: state.store.genres()?,
    }))
}

#[derive(Serialize)]
pub struct BookDetailResponse {
    #[serde(flatten)]
    pub book: BookPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_bio: Option<String>,
    pub in_wishlist: bool,
    pub is_owner: bool,
}

/// GET /api/books/{id}
pub async fn book_detail<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> Result<Json<BookDetailResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let listing = state
        .store
        .get_book(BookId(id))?
        .ok_or(ExchangeError::NotFound("Book"))?;

    let viewer = authenticate(&state, &cookies)?;
    let (in_wishlist, is_owner) = match &viewer {
        Some((_, user)) => (
            state.store.wishlist_has(user.id, listing.book.id)?,
            user.id == listing.book.user_id,
        ),
        None => (false, false),
    };

    Ok(Json(BookDetailResponse {
        book: listing_payload(&state.images, &listing),
        owner_bio: listing.owner_bio.clone(),
        in_wishlist,
        is_owner,
    }))
}

#[derive(Deserialize)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    pub genre: String,
    pub condition: String,
    pub description: String,
    #[serde(default)]
    pub year_published: Option<i32>,
    #[serde(default)]
    pub exchange_type: Option<String>,
    /// Optional base64-encoded cover image
    #[serde(default)]
    pub image: Option<String>,
    pub csrf_token: String,
}

impl BookForm {
    /// Validate the form and split it into a draft plus decoded image
    /// bytes. The image file reference is filled in by the caller once
    /// the bytes are stored.
    fn into_draft(self) -> Result<(BookDraft, Option<Vec<u8>>), ExchangeError> {
        let mut errors = validate::book_fields(
            &self.title,
            &self.author,
            &self.genre,
            &self.description,
            self.year_published,
        );

        let condition = match Condition::from_str(self.condition.trim()) {
            Some(condition) => condition,
            None => {
                errors.insert("condition", "Select a valid condition".to_string());
                Condition::Good
            }
        };

        let exchange_type = match non_empty(self.exchange_type) {
            Some(value) => match ExchangeType::from_str(&value) {
                Some(exchange_type) => exchange_type,
                None => {
                    errors.insert("exchange_type", "Select a valid exchange type".to_string());
                    ExchangeType::Trade
                }
            },
            None => ExchangeType::Trade,
        };

        let image_bytes = match non_empty(self.image) {
            Some(encoded) => match BASE64.decode(encoded.as_bytes()) {
                Ok(bytes) => Some(bytes),
                Err(_) => {
                    errors.insert("image", "Invalid image encoding".to_string());
                    None
                }
            },
            None => None,
        };

        validate::finish(errors)?;

        Ok((
            BookDraft {
                title: self.title.trim().to_string(),
                author: self.author.trim().to_string(),
                isbn: non_empty(self.isbn),
                genre: self.genre.trim().to_string(),
                condition,
                description: self.description.trim().to_string(),
                image_file: None,
                year_published: self.year_published,
                exchange_type,
            },
            image_bytes,
        ))
    }
}

#[derive(Serialize)]
pub struct CreateBookResponse {
    pub success: bool,
    pub book_id: i64,
}

/// POST /api/books
pub async fn create_book<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Json(form): Json<BookForm>,
) -> Result<Json<CreateBookResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (session, user) = mutating_user(&state.store, &cookies, &form.csrf_token)?;

    let (mut draft, image_bytes) = form.into_draft()?;
    if let Some(bytes) = image_bytes {
        draft.image_file = Some(state.images.store(&bytes, "book")?);
    }

    let book_id = state.store.create_book(user.id, &draft)?;

    flash_success(
        &state.store,
        &session,
        "Your book has been listed successfully!",
    )?;

    Ok(Json(CreateBookResponse {
        success: true,
        book_id: book_id.0,
    }))
}

#[derive(Serialize)]
pub struct BookActionResponse {
    pub success: bool,
}

fn check_owner_or_admin(
    user_id: crate::store::UserId,
    role: Role,
    book: &Book,
) -> Result<(), ExchangeError> {
    if book.user_id != user_id && role != Role::Admin {
        return Err(ExchangeError::Forbidden);
    }
    Ok(())
}

/// PUT /api/books/{id}
pub async fn update_book<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Path(id): Path<i64>,
    Json(form): Json<BookForm>,
) -> Result<Json<BookActionResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (_, user) = mutating_user(&state.store, &cookies, &form.csrf_token)?;

    let existing = state
        .store
        .get_book(BookId(id))?
        .ok_or(ExchangeError::NotFound("Book"))?;
    check_owner_or_admin(user.id, user.role, &existing.book)?;

    let (mut draft, image_bytes) = form.into_draft()?;
    let replaced = image_bytes.is_some();
    draft.image_file = match image_bytes {
        Some(bytes) => Some(state.images.store(&bytes, "book")?),
        None => existing.book.image_file.clone(),
    };

    state.store.update_book(BookId(id), &draft)?;

    // The replaced file is best-effort cleanup; the row is authoritative
    if replaced {
        if let Some(old) = existing.book.image_file {
            state.images.delete(&old);
        }
    }

    Ok(Json(BookActionResponse { success: true }))
}

#[derive(Deserialize)]
pub struct DeleteBookRequest {
    pub csrf_token: String,
}

/// DELETE /api/books/{id}
pub async fn delete_book<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Path(id): Path<i64>,
    Json(req): Json<DeleteBookRequest>,
) -> Result<Json<BookActionResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (session, user) = mutating_user(&state.store, &cookies, &req.csrf_token)?;

    let existing = state
        .store
        .get_book(BookId(id))?
        .ok_or(ExchangeError::NotFound("Book"))?;
    check_owner_or_admin(user.id, user.role, &existing.book)?;

    state.store.delete_book(BookId(id))?;

    if let Some(file) = existing.book.image_file {
        state.images.delete(&file);
    }

    flash_success(&state.store, &session, "Book removed.")?;

    Ok(Json(BookActionResponse { success: true }))
}

#[derive(Deserialize)]
pub struct BookStatusRequest {
    pub status: String,
    pub csrf_token: String,
}

/// POST /api/books/{id}/status
pub async fn set_book_status<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
    Path(id): Path<i64>,
    Json(req): Json<BookStatusRequest>,
) -> Result<Json<BookActionResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (_, user) = mutating_user(&state.store, &cookies, &req.csrf_token)?;

    let status = BookStatus::from_str(&req.status).ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.insert("status", format!("Unknown status: {}", req.status));
        ExchangeError::Validation(errors)
    })?;

    let existing = state
        .store
        .get_book(BookId(id))?
        .ok_or(ExchangeError::NotFound("Book"))?;
    check_owner_or_admin(user.id, user.role, &existing.book)?;

    state.store.set_book_status(BookId(id), status)?;

    Ok(Json(BookActionResponse { success: true }))
}


#[derive(Serialize)]
pub struct MyBooksResponse {
    pub books: Vec<BookPayload>,
    pub total: i64,
    pub available: i64,
    pub pending: i64,
    pub exchanged: i64,
}

/// GET /api/my-books
pub async fn my_books<S, I, M>(
    State(state): State<Arc<AppState<S, I, M>>>,
    cookies: Cookies,
) -> Result<Json<MyBooksResponse>, ExchangeError>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    let (_, user) = require_user(&state, &cookies)?;

    let books = state.store.books_by_user(user.id)?;
    let mut response = MyBooksResponse {
        books: Vec::with_capacity(books.len()),
        total: books.len() as i64,
        available: 0,
        pending: 0,
        exchanged: 0,
    };
    for book in &books {
        match book.status {
            BookStatus::Available => response.available += 1,
            BookStatus::Pending => response.pending += 1,
            BookStatus::Exchanged => response.exchanged += 1,
        }
        response
            .books
            .push(book_payload(&state.images, book, None, None));
    }

    Ok(Json(response))
}

//! HTTP routes for the exchange

mod admin;
mod auth;
mod books;
mod contact;
mod password;
mod profile;
pub mod session;
mod wishlist;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::mailer::Mailer;
use crate::state::AppState;
use crate::store::Store;
use crate::upload::ImageStore;

/// Create the router with all routes
pub fn create_router<S, I, M>(state: Arc<AppState<S, I, M>>) -> Router
where
    S: Store + 'static,
    I: ImageStore + 'static,
    M: Mailer + 'static,
{
    let upload_dir = state.config.upload_dir.clone();

    Router::new()
        // Session & credentials
        .route("/api/session", get(session::session_context))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/password/change", post(password::change_password))
        .route("/api/password/forgot", post(password::forgot_password))
        .route("/api/password/reset", post(password::reset_password))
        // Profile
        .route("/api/profile", get(profile::profile).put(profile::update_profile))
        // Catalog
        .route("/api/books", get(books::list_books).post(books::create_book))
        .route("/api/books/featured", get(books::featured_books))
        .route(
            "/api/books/{id}",
            get(books::book_detail)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/api/books/{id}/status", post(books::set_book_status))
        .route("/api/my-books", get(books::my_books))
        .route("/api/genres", get(books::genres))
        // Wishlist
        .route("/api/wishlist", get(wishlist::list_wishlist))
        .route("/api/wishlist/toggle", post(wishlist::toggle))
        .route("/api/wishlist/add", post(wishlist::add))
        .route("/api/wishlist/remove", post(wishlist::remove))
        // Contact form
        .route("/api/contact", post(contact::submit))
        // Admin
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/{id}", delete(admin::delete_user))
        .route("/api/admin/books", get(admin::list_books))
        .route("/api/admin/messages", get(admin::list_messages))
        .route(
            "/api/admin/messages/{id}/status",
            post(admin::set_message_status),
        )
        .route("/api/admin/messages/{id}", delete(admin::delete_message))
        // Uploaded cover images
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

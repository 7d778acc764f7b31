//! CSRF enforcement: mutations with a bad token die before side effects

mod common;

use book_exchange::store::{BookFilters, BookStore, ContactStore, UserStore, WishlistStore};
use common::{anonymous_client, create_test_app, create_user, seed_book, seed_user};
use serde_json::{json, Value};

#[tokio::test]
async fn test_create_book_with_wrong_token_has_no_effect() {
    let app = create_test_app();
    let client = create_user(&app.server, "Alice", "alice@x.com", "Abc12345!").await;

    let response = app
        .server
        .post("/api/books")
        .add_cookie(client.session_cookie())
        .json(&json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "genre": "Science Fiction",
            "condition": "Good",
            "description": "Spice",
            "csrf_token": "0000000000000000000000000000000000000000000000000000000000000000",
        }))
        .await;
    assert_eq!(response.status_code(), 403);

    let body: Value = response.json();
    assert_eq!(body["success"], false);

    // Nothing was written
    assert_eq!(app.store.count_books(&BookFilters::default()).unwrap(), 0);
}

#[tokio::test]
async fn test_login_requires_session_token() {
    let app = create_test_app();
    let _ = create_user(&app.server, "Alice", "alice@x.com", "Abc12345!").await;

    // Valid session cookie, wrong CSRF token
    let anon = anonymous_client(&app.server).await;
    let response = app
        .server
        .post("/api/login")
        .add_cookie(anon.session_cookie())
        .json(&json!({
            "email": "alice@x.com",
            "password": "Abc12345!",
            "csrf_token": "not-the-token",
        }))
        .await;
    assert_eq!(response.status_code(), 403);

    // No session cookie at all
    let response = app
        .server
        .post("/api/login")
        .json(&json!({
            "email": "alice@x.com",
            "password": "Abc12345!",
            "csrf_token": anon.csrf,
        }))
        .await;
    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn test_contact_without_session_rejected() {
    let app = create_test_app();

    let response = app
        .server
        .post("/api/contact")
        .json(&json!({
            "name": "Visitor",
            "email": "visitor@x.com",
            "subject": "Hi",
            "message": "Hello there",
            "csrf_token": "whatever",
        }))
        .await;
    assert_eq!(response.status_code(), 403);
    assert_eq!(app.store.count_messages(None).unwrap(), 0);
}

/// A token from one session is worthless in another
#[tokio::test]
async fn test_token_is_session_bound() {
    let app = create_test_app();
    let alice = create_user(&app.server, "Alice", "alice@x.com", "Abc12345!").await;
    let bob = create_user(&app.server, "Bob", "bob@x.com", "Abc12345!").await;

    let owner = seed_user(&app.store, "owner@x.com");
    let book = seed_book(
        &app.store,
        owner,
        "Dune",
        "Science Fiction",
        book_exchange::store::Condition::Good,
    );

    // Bob's cookie with Alice's CSRF token
    let response = app
        .server
        .post("/api/wishlist/toggle")
        .add_cookie(bob.session_cookie())
        .json(&json!({ "book_id": book.0, "csrf_token": alice.csrf }))
        .await;
    assert_eq!(response.status_code(), 403);

    let bob_id = app.store.get_user_by_email("bob@x.com").unwrap().unwrap().id;
    assert!(!app.store.wishlist_has(bob_id, book).unwrap());
}

#[tokio::test]
async fn test_wishlist_toggle_with_valid_token_succeeds() {
    let app = create_test_app();
    let client = create_user(&app.server, "Bob", "bob@x.com", "Abc12345!").await;

    let owner = seed_user(&app.store, "owner@x.com");
    let book = seed_book(
        &app.store,
        owner,
        "Dune",
        "Science Fiction",
        book_exchange::store::Condition::Good,
    );

    let response = app
        .server
        .post("/api/wishlist/toggle")
        .add_cookie(client.session_cookie())
        .json(&json!({ "book_id": book.0, "csrf_token": client.csrf }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["action"], "added");
}

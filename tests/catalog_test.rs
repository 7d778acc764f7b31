//! Catalog filtering, sorting, pagination, and count consistency

mod common;

use book_exchange::store::{BookFilters, BookStatus, BookStore, Condition, SortOrder};
use common::{create_test_app, seed_book, seed_user, TestApp};
use serde_json::Value;

/// Five fantasy books plus one outlier, titles deliberately unsorted
fn seed_fantasy_shelf(app: &TestApp) {
    let owner = seed_user(&app.store, "owner@x.com");
    for title in ["Elantris", "Abarat", "Duskfall", "Coraline", "Babel"] {
        seed_book(&app.store, owner, title, "Fantasy", Condition::Good);
    }
    seed_book(&app.store, owner, "Cosmos", "Science", Condition::New);
}

/// Genre filter + title sort + pagination, with the count as denominator
#[tokio::test]
async fn test_genre_title_sort_with_pagination() {
    let app = create_test_app();
    seed_fantasy_shelf(&app);

    let response = app
        .server
        .get("/api/books?genre=Fantasy&sort=title&per_page=2&page=1")
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["total"], 5);
    assert_eq!(body["total_pages"], 3);
    let titles: Vec<&str> = body["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Abarat", "Babel"]);

    let response = app
        .server
        .get("/api/books?genre=Fantasy&sort=title&per_page=2&page=2")
        .await;
    let body: Value = response.json();
    let titles: Vec<&str> = body["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Coraline", "Duskfall"]);
}

/// countBooks agrees with listBooks across filter combinations
#[tokio::test]
async fn test_count_matches_listing() {
    let app = create_test_app();
    seed_fantasy_shelf(&app);

    for filters in [
        BookFilters::available(),
        BookFilters {
            genre: Some("Fantasy".to_string()),
            ..BookFilters::available()
        },
        BookFilters {
            condition: Some(Condition::New),
            ..BookFilters::available()
        },
        BookFilters {
            search: Some("a".to_string()),
            ..BookFilters::available()
        },
        BookFilters {
            genre: Some("Fantasy".to_string()),
            search: Some("bab".to_string()),
            ..BookFilters::available()
        },
    ] {
        let total = app.store.count_books(&filters).unwrap();
        let listed = app.store.list_books(&filters, total.max(1), 0).unwrap();
        assert_eq!(listed.len() as i64, total, "filters: {filters:?}");
    }
}

/// A page past the end clamps to the last page rather than erroring
#[tokio::test]
async fn test_page_beyond_end_clamps() {
    let app = create_test_app();
    seed_fantasy_shelf(&app);

    let response = app
        .server
        .get("/api/books?genre=Fantasy&per_page=2&page=99")
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["page"], 3);
    assert_eq!(body["books"].as_array().unwrap().len(), 1);

    // Below 1 clamps up
    let response = app.server.get("/api/books?per_page=2&page=0").await;
    let body: Value = response.json();
    assert_eq!(body["page"], 1);

    // At store level, an offset past the end is just an empty slice
    let books = app
        .store
        .list_books(&BookFilters::available(), 2, 1000)
        .unwrap();
    assert!(books.is_empty());
}

#[tokio::test]
async fn test_empty_catalog_is_page_one_of_one() {
    let app = create_test_app();

    let response = app.server.get("/api/books?page=7").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["total"], 0);
    assert_eq!(body["page"], 1);
    assert_eq!(body["total_pages"], 1);
    assert!(body["books"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_is_case_insensitive_across_fields() {
    let app = create_test_app();
    seed_fantasy_shelf(&app);

    // Genre text
    let response = app.server.get("/api/books?search=SCIENCE").await;
    let body: Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["books"][0]["title"], "Cosmos");

    // Description text ("is a fine book" is seeded everywhere)
    let response = app.server.get("/api/books?search=fine%20book").await;
    let body: Value = response.json();
    assert_eq!(body["total"], 6);
}

/// Whitespace-only search means "no search filter", not "match nothing"
#[tokio::test]
async fn test_blank_search_ignored() {
    let app = create_test_app();
    seed_fantasy_shelf(&app);

    let response = app.server.get("/api/books?search=%20%20").await;
    let body: Value = response.json();
    assert_eq!(body["total"], 6);
}

#[tokio::test]
async fn test_unknown_condition_is_rejected() {
    let app = create_test_app();
    seed_fantasy_shelf(&app);

    let response = app.server.get("/api/books?condition=Mint").await;
    assert_eq!(response.status_code(), 422);

    let body: Value = response.json();
    assert!(body["errors"]["condition"].is_string());
}

#[tokio::test]
async fn test_unknown_sort_falls_back_to_newest() {
    let app = create_test_app();
    seed_fantasy_shelf(&app);

    let response = app.server.get("/api/books?sort=bogus").await;
    assert_eq!(response.status_code(), 200);

    // Last seeded book comes first
    let body: Value = response.json();
    assert_eq!(body["books"][0]["title"], "Cosmos");
}

#[tokio::test]
async fn test_condition_sort_best_first() {
    let app = create_test_app();
    let owner = seed_user(&app.store, "owner@x.com");
    seed_book(&app.store, owner, "Tattered", "Fiction", Condition::Poor);
    seed_book(&app.store, owner, "Crisp", "Fiction", Condition::New);
    seed_book(&app.store, owner, "Loved", "Fiction", Condition::LikeNew);
    seed_book(&app.store, owner, "Okay", "Fiction", Condition::Fair);

    let response = app.server.get("/api/books?sort=condition").await;
    let body: Value = response.json();
    let titles: Vec<&str> = body["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Crisp", "Loved", "Okay", "Tattered"]);
}

/// Ties within a condition rank keep insertion order
#[tokio::test]
async fn test_condition_sort_tie_break_is_insertion_order() {
    let app = create_test_app();
    let owner = seed_user(&app.store, "owner@x.com");
    seed_book(&app.store, owner, "First Good", "Fiction", Condition::Good);
    seed_book(&app.store, owner, "Second Good", "Fiction", Condition::Good);
    seed_book(&app.store, owner, "A New One", "Fiction", Condition::New);

    let filters = BookFilters {
        sort: SortOrder::Condition,
        ..BookFilters::available()
    };
    let books = app.store.list_books(&filters, 10, 0).unwrap();
    let titles: Vec<&str> = books.iter().map(|b| b.book.title.as_str()).collect();
    assert_eq!(titles, ["A New One", "First Good", "Second Good"]);
}

#[tokio::test]
async fn test_unavailable_books_hidden_from_catalog() {
    let app = create_test_app();
    let owner = seed_user(&app.store, "owner@x.com");
    let visible = seed_book(&app.store, owner, "Here", "Fiction", Condition::Good);
    let hidden = seed_book(&app.store, owner, "Gone", "Fiction", Condition::Good);
    app.store
        .set_book_status(hidden, BookStatus::Exchanged)
        .unwrap();

    let response = app.server.get("/api/books").await;
    let body: Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["books"][0]["id"], visible.0);
}

#[tokio::test]
async fn test_genres_are_live_and_sorted() {
    let app = create_test_app();
    let owner = seed_user(&app.store, "owner@x.com");
    seed_book(&app.store, owner, "A", "Mystery", Condition::Good);
    seed_book(&app.store, owner, "B", "Biography", Condition::Good);
    let gone = seed_book(&app.store, owner, "C", "Poetry", Condition::Good);
    app.store.set_book_status(gone, BookStatus::Pending).unwrap();

    let response = app.server.get("/api/genres").await;
    let body: Value = response.json();
    assert_eq!(
        body["genres"],
        serde_json::json!(["Biography", "Mystery"])
    );
}

#[tokio::test]
async fn test_featured_returns_three_newest() {
    let app = create_test_app();
    seed_fantasy_shelf(&app);

    let response = app.server.get("/api/books/featured").await;
    let body: Value = response.json();
    let titles: Vec<&str> = body["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Cosmos", "Babel", "Coraline"]);
}

#[tokio::test]
async fn test_exchange_type_filter() {
    let app = create_test_app();
    let owner = seed_user(&app.store, "owner@x.com");
    seed_book(&app.store, owner, "Traded", "Fiction", Condition::Good);
    // seed_book lists everything as a trade; flip one to giveaway
    let giveaway = seed_book(&app.store, owner, "Given", "Fiction", Condition::Good);
    {
        use book_exchange::store::{BookDraft, ExchangeType};
        app.store
            .update_book(
                giveaway,
                &BookDraft {
                    title: "Given".to_string(),
                    author: "Test Author".to_string(),
                    isbn: None,
                    genre: "Fiction".to_string(),
                    condition: Condition::Good,
                    description: "Given is a fine book".to_string(),
                    image_file: None,
                    year_published: Some(2015),
                    exchange_type: ExchangeType::Giveaway,
                },
            )
            .unwrap();
    }

    let response = app.server.get("/api/books?exchange_type=giveaway").await;
    let body: Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["books"][0]["title"], "Given");

    let response = app.server.get("/api/books?exchange_type=barter").await;
    assert_eq!(response.status_code(), 422);
}

#[tokio::test]
async fn test_book_detail_includes_owner() {
    let app = create_test_app();
    let owner = seed_user(&app.store, "owner@x.com");
    let book = seed_book(&app.store, owner, "Dune", "Science Fiction", Condition::Good);

    let response = app.server.get(&format!("/api/books/{}", book.0)).await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["title"], "Dune");
    assert_eq!(body["owner_name"], "Seeded Owner");
    assert_eq!(body["in_wishlist"], false);
    assert_eq!(body["is_owner"], false);
    // No image on seeded books, so the placeholder URL is served
    assert_eq!(body["cover_url"], "/assets/book-placeholder.png");

    let response = app.server.get("/api/books/9999").await;
    assert_eq!(response.status_code(), 404);
}

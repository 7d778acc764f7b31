//! Common test utilities for exchange integration tests

#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use axum_test::TestServer;
use book_exchange::store::{
    BookDraft, BookId, BookStore, Condition, ExchangeType, NewUser, UserId, UserStore,
};
use book_exchange::{routes, AppState, Config, InMemoryStore, LocalImageStore, Mailer};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const SESSION_COOKIE: &str = "bookex_session";
pub const REMEMBER_COOKIE: &str = "bookex_remember";

/// Mock mailer that captures tokens instead of sending them
#[derive(Default, Clone)]
pub struct MockMailer {
    /// Captured (email, token) pairs
    pub sent: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get the last token sent to an email
    pub fn get_token(&self, email: &str) -> Option<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, _)| e == email)
            .map(|(_, t)| t.clone())
    }
}

impl Mailer for MockMailer {
    fn send_verification(&self, email: &str, token: &str) -> Result<(), String> {
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), token.to_string()));
        Ok(())
    }

    fn send_password_reset(&self, email: &str, token: &str) -> Result<(), String> {
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), token.to_string()));
        Ok(())
    }
}

/// A running test server plus handles on its collaborators
pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryStore>,
    pub mailer: MockMailer,
    _upload_dir: TempDir,
}

/// Create a test server over an in-memory store and a temp upload dir
pub fn create_test_app() -> TestApp {
    let upload_dir = TempDir::new().expect("Failed to create upload dir");
    let config = Config {
        secure_cookies: false,
        upload_dir: upload_dir.path().to_path_buf(),
        ..Config::default()
    };

    let store = Arc::new(InMemoryStore::new());
    let mailer = MockMailer::new();
    let images = LocalImageStore::new(config.upload_dir.clone(), config.max_image_bytes);

    let state = Arc::new(AppState::new(
        config,
        store.clone(),
        images,
        mailer.clone(),
    ));

    let app = routes::create_router(state);
    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp {
        server,
        store,
        mailer,
        _upload_dir: upload_dir,
    }
}

/// Cookies and CSRF secret for a logged-in (or anonymous) caller
pub struct Client {
    pub session: String,
    pub csrf: String,
    pub remember: Option<String>,
}

impl Client {
    pub fn session_cookie(&self) -> cookie::Cookie<'static> {
        cookie::Cookie::new(SESSION_COOKIE, self.session.clone())
    }

    pub fn remember_cookie(&self) -> cookie::Cookie<'static> {
        cookie::Cookie::new(
            REMEMBER_COOKIE,
            self.remember.clone().expect("No remember token"),
        )
    }
}

/// Fetch a fresh anonymous session and its CSRF token
pub async fn anonymous_client(server: &TestServer) -> Client {
    let response = server.get("/api/session").await;
    assert_eq!(response.status_code(), 200);

    let session = response
        .maybe_cookie(SESSION_COOKIE)
        .expect("No session cookie")
        .value()
        .to_string();
    let body: Value = response.json();
    let csrf = body["csrf_token"].as_str().expect("No csrf token").to_string();

    Client {
        session,
        csrf,
        remember: None,
    }
}

/// Register a user through the API; returns the new user id
pub async fn register_user(server: &TestServer, name: &str, email: &str, password: &str) -> UserId {
    let client = anonymous_client(server).await;
    let response = server
        .post("/api/register")
        .add_cookie(client.session_cookie())
        .json(&json!({
            "name": name,
            "email": email,
            "password": password,
            "csrf_token": client.csrf,
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    UserId(body["user_id"].as_i64().expect("No user id"))
}

/// Log in through the API; returns the post-login session and CSRF
pub async fn login(server: &TestServer, email: &str, password: &str, remember: bool) -> Client {
    let client = anonymous_client(server).await;
    let response = server
        .post("/api/login")
        .add_cookie(client.session_cookie())
        .json(&json!({
            "email": email,
            "password": password,
            "remember": remember,
            "csrf_token": client.csrf,
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let session = response
        .maybe_cookie(SESSION_COOKIE)
        .expect("No session cookie after login")
        .value()
        .to_string();
    let body: Value = response.json();
    let csrf = body["csrf_token"].as_str().expect("No csrf token").to_string();
    let remember_token = response
        .maybe_cookie(REMEMBER_COOKIE)
        .map(|c| c.value().to_string());

    Client {
        session,
        csrf,
        remember: remember_token,
    }
}

/// Register and log in, in one go
pub async fn create_user(server: &TestServer, name: &str, email: &str, password: &str) -> Client {
    register_user(server, name, email, password).await;
    login(server, email, password, false).await
}

/// Seed a user directly into the store (no login needed)
pub fn seed_user(store: &InMemoryStore, email: &str) -> UserId {
    store
        .create_user(NewUser {
            name: "Seeded Owner".to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            verification_token: None,
        })
        .expect("Failed to seed user")
}

/// Seed a book directly into the store
pub fn seed_book(
    store: &InMemoryStore,
    owner: UserId,
    title: &str,
    genre: &str,
    condition: Condition,
) -> BookId {
    store
        .create_book(
            owner,
            &BookDraft {
                title: title.to_string(),
                author: "Test Author".to_string(),
                isbn: None,
                genre: genre.to_string(),
                condition,
                description: format!("{title} is a fine book"),
                image_file: None,
                year_published: Some(2015),
                exchange_type: ExchangeType::Trade,
            },
        )
        .expect("Failed to seed book")
}

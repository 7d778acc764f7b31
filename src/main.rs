//! Community Book Exchange server

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use book_exchange::{
    routes, AppState, Config, ConsoleMailer, LocalImageStore, SqliteStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "book_exchange=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");

    // The upload directory must exist before ServeDir and the image
    // store touch it
    std::fs::create_dir_all(&config.upload_dir)?;

    let store = SqliteStore::open(&config.database_path)?;
    let images = LocalImageStore::new(config.upload_dir.clone(), config.max_image_bytes);

    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        images,
        ConsoleMailer::new(),
    ));

    // Create router
    let app = routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Book exchange listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

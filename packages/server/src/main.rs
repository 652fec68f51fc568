use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::storage::FilesystemBlobStore;
use tracing::{Level, info};

use server::config::AppConfig;
use server::database::init_db;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    server::seed::seed_categories(&db).await?;
    server::seed::ensure_indexes(&db).await?;

    let blob_store = FilesystemBlobStore::new(
        config.storage.root.clone(),
        config.storage.max_blob_size,
    )
    .await
    .context("Failed to initialize blob storage")?;

    let state = AppState {
        db,
        blob_store: Arc::new(blob_store),
        config: config.clone(),
    };

    let app = server::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

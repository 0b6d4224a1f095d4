//! Work Radar - local mirror of open work across GitHub, GitLab and Jira.
//!
//! Serves a small HTTP API. Each list request reconciles the provider's open
//! items into SQLite and returns the stored rows.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

use config::ServerConfig;
use error::AppError;
use services::SyncEngine;
use tokio_util::sync::CancellationToken;

/// Open the database and serve the API until `shutdown` is cancelled.
pub async fn run(config: ServerConfig, shutdown: CancellationToken) -> Result<(), AppError> {
    log::info!("Opening database at {}", config.database.display());
    let pool = db::initialize(&config.database).await?;

    let engine = SyncEngine::new(pool.clone(), config.http_timeout_secs);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", config.listen, e)))?;

    let result = services::http_server::serve(listener, engine, shutdown).await;

    pool.close().await;
    result
}

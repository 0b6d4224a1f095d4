//! HTTP server wiring: router assembly, CORS and graceful shutdown.

use crate::error::AppError;
use crate::services::http_api::{api_routes, ApiState};
use crate::services::sync_engine::SyncEngine;
use axum::http::{header, Method};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

/// Build the full application router.
pub fn build_router(engine: SyncEngine) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT])
        .allow_headers([header::CONTENT_TYPE]);

    api_routes().with_state(ApiState { engine }).layer(cors)
}

/// Serve the API on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    engine: SyncEngine,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::internal(format!("Failed to read listener address: {}", e)))?;
    log::info!("Server listening on http://{}", addr);

    axum::serve(listener, build_router(engine))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    log::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let dir = tempdir().unwrap();
        let pool = db::initialize(&dir.path().join("test.db")).await.unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let token = CancellationToken::new();

        let server = tokio::spawn(serve(
            listener,
            SyncEngine::with_default_timeout(pool),
            token.clone(),
        ));
        token.cancel();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}

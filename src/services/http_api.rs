//! REST routes for tracked items and settings.
//!
//! Every list route runs a reconciliation pass for its provider before
//! answering, so responses always reflect the stored rows after the pass.

use crate::db;
use crate::error::AppError;
use crate::models::{IssueList, MergeRequestList, PullRequestList, SettingsResponse, SettingsUpdate};
use crate::services::sync_engine::SyncEngine;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

/// Shared state for the API routes.
#[derive(Debug, Clone)]
pub struct ApiState {
    pub engine: SyncEngine,
}

// ── Error handling ───────────────────────────────────────────────────────────

/// JSON error body.
#[derive(Debug, Serialize)]
struct ApiError {
    code: &'static str,
    message: String,
}

/// Wrapper to make AppError usable as an axum error response.
#[derive(Debug)]
pub struct ApiErr(pub AppError);

impl ApiErr {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            AppError::Configuration { .. } => (StatusCode::SERVICE_UNAVAILABLE, "CONFIGURATION_ERROR"),
            AppError::RemoteApi { .. } => (StatusCode::SERVICE_UNAVAILABLE, "REMOTE_API_ERROR"),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AppError::Persistence { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
            AppError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Upstream status codes stay in the log; the caller only sees 503.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("Request failed: {:?}", self.0);
            let body = ApiError {
                code,
                message: "Internal server error".to_string(),
            };
            return (status, Json(body)).into_response();
        }

        if self.0.is_unavailable() {
            log::warn!("Upstream unavailable: {:?}", self.0);
        }
        let message = self.0.to_string();

        (status, Json(ApiError { code, message })).into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<sqlx::Error> for ApiErr {
    fn from(err: sqlx::Error) -> Self {
        Self(AppError::from(err))
    }
}

// ── Routes ───────────────────────────────────────────────────────────────────

pub fn api_routes() -> Router<ApiState> {
    Router::new()
        .route("/pull-requests", get(list_pull_requests))
        .route("/merge-requests", get(list_merge_requests))
        .route("/issues", get(list_issues))
        .route("/settings", get(get_settings).put(put_settings))
        .route("/health", get(health))
        .fallback(not_found)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /pull-requests — reconcile and list GitHub pull requests.
async fn list_pull_requests(
    State(state): State<ApiState>,
) -> Result<Json<PullRequestList>, ApiErr> {
    let outcome = state.engine.sync_pull_requests().await?;
    Ok(Json(outcome.items.into()))
}

/// GET /merge-requests — reconcile and list GitLab merge requests.
async fn list_merge_requests(
    State(state): State<ApiState>,
) -> Result<Json<MergeRequestList>, ApiErr> {
    let outcome = state.engine.sync_merge_requests().await?;
    Ok(Json(outcome.items.into()))
}

/// GET /issues — reconcile and list Jira issues.
async fn list_issues(State(state): State<ApiState>) -> Result<Json<IssueList>, ApiErr> {
    let outcome = state.engine.sync_issues().await?;
    Ok(Json(outcome.items.into()))
}

/// GET /settings — settings with secrets omitted.
async fn get_settings(State(state): State<ApiState>) -> Result<Json<SettingsResponse>, ApiErr> {
    let settings = db::settings::get_settings(state.engine.pool())
        .await?
        .ok_or_else(|| AppError::not_found("settings"))?;

    Ok(Json(settings.into()))
}

/// PUT /settings — create or partially update the settings row.
///
/// The body is parsed here rather than with the `Json` extractor so that
/// malformed and unknown-field payloads get the same 400 body as an empty one.
async fn put_settings(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<SettingsResponse>, ApiErr> {
    let update: SettingsUpdate = serde_json::from_slice(&body)
        .map_err(|e| AppError::invalid_input(format!("Invalid settings payload: {}", e)))?;

    let settings = db::settings::upsert_settings(state.engine.pool(), &update).await?;
    Ok(Json(settings.into()))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn not_found(uri: Uri) -> ApiErr {
    ApiErr(AppError::not_found(format!("route {}", uri.path())))
}

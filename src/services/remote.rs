//! HTTP plumbing shared by the GitHub, GitLab and Jira clients.
//!
//! Turns raw `reqwest` responses into either parsed data, a rate-limit
//! signal, or an [`AppError::RemoteApi`] with a readable cause.

use crate::error::AppError;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default timeout for outbound requests, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Page size for the single bounded call each connector makes.
pub const PAGE_SIZE: u32 = 100;

/// Outcome of a remote call that completed at the HTTP level.
#[derive(Debug)]
pub enum ApiResponse<T> {
    /// 2xx with a parseable body.
    Data(T),

    /// The remote is throttling us; carries its message.
    RateLimited(String),
}

/// Build an HTTP client with default headers and a request timeout.
pub fn build_client(headers: header::HeaderMap, timeout_secs: u64) -> Result<Client, AppError> {
    Client::builder()
        .default_headers(headers)
        .user_agent(concat!("work-radar/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))
}

/// Build an `Authorization` header value, rejecting tokens with invalid characters.
pub fn authorization(scheme: &str, credentials: &str) -> Result<header::HeaderValue, AppError> {
    let mut value = header::HeaderValue::from_str(&format!("{} {}", scheme, credentials))
        .map_err(|_| AppError::configuration("Credential contains characters not allowed in a header"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Handle an API response: parse success bodies, detect throttling, and turn
/// everything else into a remote API error.
pub async fn handle_response<T: DeserializeOwned>(
    response: Response,
    endpoint: &str,
) -> Result<ApiResponse<T>, AppError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map(ApiResponse::Data)
            .map_err(|e| {
                AppError::remote_api_full(
                    format!("Failed to parse response: {}", e),
                    status.as_u16(),
                    endpoint,
                )
            });
    }

    let rate_limit_exhausted = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (rate_limit_exhausted || mentions_rate_limit(&body)))
    {
        let message = body_message(&body).unwrap_or_else(|| "Rate limit exceeded".to_string());
        return Ok(ApiResponse::RateLimited(message));
    }

    let message = match (status, body_message(&body)) {
        (StatusCode::UNAUTHORIZED, _) => "Credentials were rejected".to_string(),
        (StatusCode::FORBIDDEN, _) => "Access denied".to_string(),
        (StatusCode::NOT_FOUND, _) => "Resource not found".to_string(),
        (_, Some(msg)) => msg,
        _ => format!("Request failed ({})", status.as_u16()),
    };

    Err(AppError::remote_api_full(message, status.as_u16(), endpoint))
}

/// Whether a message from the remote talks about rate limiting.
pub fn mentions_rate_limit(text: &str) -> bool {
    text.to_ascii_lowercase().contains("rate limit")
}

/// Pull a human-readable message out of an error body.
///
/// GitHub and GitLab use `{"message": ...}` or `{"error": ...}`; Jira uses
/// `{"errorMessages": [...]}`.
fn body_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<serde_json::Value>(body).ok()?;

    if let Some(messages) = value.get("errorMessages").and_then(|m| m.as_array()) {
        let joined = messages
            .iter()
            .filter_map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        if !joined.is_empty() {
            return Some(joined);
        }
    }

    value
        .get("message")
        .or_else(|| value.get("error"))
        .map(|m| match m.as_str() {
            Some(s) => s.to_string(),
            // GitLab sometimes sends {"message": {"base": ["..."]}}
            None => m.to_string(),
        })
}

/// Parse a remote ISO 8601 timestamp into Unix seconds.
///
/// Accepts RFC 3339 (`2024-01-15T10:30:00.123Z`, GitHub/GitLab) and the
/// colon-less offset Jira uses (`2024-01-15T10:30:00.000+0000`).
pub fn parse_timestamp(value: &str) -> Result<i64, AppError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .or_else(|_| chrono::DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.timestamp())
        .map_err(|e| AppError::remote_api(format!("Invalid timestamp '{}': {}", value, e)))
}

//! Application error types.
//!
//! Every failure that crosses a connector or API boundary is one of these
//! variants. They serialize to a structured JSON object so callers can tell a
//! misconfiguration apart from a remote outage.

use serde::Serialize;
use thiserror::Error;

/// Application-level errors returned by connectors, the settings store and
/// the HTTP API.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// Settings are missing or a provider's required fields are unset.
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        provider: Option<String>,
    },

    /// Remote tracker request failed: transport, non-2xx or bad payload.
    #[error("Remote API error: {message}")]
    RemoteApi {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        provider: Option<String>,
    },

    /// Local storage transaction failed. Always preceded by a rollback.
    #[error("Persistence error: {message}")]
    Persistence {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
    },

    /// Requested resource not found.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Invalid input provided by the caller.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Internal application error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            provider: None,
        }
    }

    /// Create a configuration error attributed to a provider.
    pub fn configuration_for(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            provider: Some(provider.into()),
        }
    }

    /// Create a remote API error.
    pub fn remote_api(message: impl Into<String>) -> Self {
        Self::RemoteApi {
            message: message.into(),
            status_code: None,
            endpoint: None,
            provider: None,
        }
    }

    /// Create a remote API error with status code and endpoint.
    pub fn remote_api_full(
        message: impl Into<String>,
        status_code: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::RemoteApi {
            message: message.into(),
            status_code: Some(status_code),
            endpoint: Some(endpoint.into()),
            provider: None,
        }
    }

    /// Attach the provider name to a remote API or configuration error.
    ///
    /// Other variants are returned unchanged.
    pub fn with_provider(self, name: &str) -> Self {
        match self {
            Self::RemoteApi {
                message,
                status_code,
                endpoint,
                ..
            } => Self::RemoteApi {
                message,
                status_code,
                endpoint,
                provider: Some(name.to_string()),
            },
            Self::Configuration { message, .. } => Self::Configuration {
                message,
                provider: Some(name.to_string()),
            },
            other => other,
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            operation: None,
        }
    }

    /// Create a persistence error with operation context.
    pub fn persistence_with_op(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            operation: Some(operation.into()),
        }
    }

    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error means the service's dependencies are unavailable
    /// (misconfigured or unreachable remote) rather than a local fault.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::RemoteApi { .. })
    }
}

// Conversions from common error types

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::persistence(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::remote_api("Request timed out")
        } else if err.is_connect() {
            Self::remote_api("Failed to connect to server")
        } else if let Some(status) = err.status() {
            Self::RemoteApi {
                message: format!("HTTP error: {}", err),
                status_code: Some(status.as_u16()),
                endpoint: None,
                provider: None,
            }
        } else if err.is_decode() {
            Self::remote_api(format!("Failed to decode response: {}", err))
        } else {
            Self::remote_api(err.to_string())
        }
    }
}

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        Self::persistence(err.to_string())
    }
}

//! Business logic services.
//!
//! This module contains the provider clients, the reconciliation engine that
//! mirrors their open items into local storage, and the HTTP API on top.

pub mod github_client;
pub mod gitlab_client;
pub mod http_api;
pub mod http_server;
pub mod jira_client;
pub mod reconcile;
pub mod remote;
pub mod sync_engine;

pub use sync_engine::SyncEngine;

//! GitHub pull request model.

use crate::db::tracked::{SqliteQuery, TrackedItem};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An open GitHub pull request the configured user authored or was asked to review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PullRequest {
    /// Local row ID (UUID v4), stable across syncs.
    pub id: String,

    /// PR number.
    pub pull_request: i64,

    /// PR title.
    pub title: String,

    /// PR body (Markdown).
    pub description: String,

    /// GitHub state, e.g. `OPEN`.
    pub status: String,

    /// Repository name within the organization.
    pub repository: String,

    /// URL to the PR on GitHub.
    pub url: String,

    /// Whether the configured user authored the PR (false means reviewer).
    pub is_assigned: bool,

    /// PR creation timestamp (Unix).
    pub created_at: i64,

    /// PR last update timestamp (Unix).
    pub updated_at: i64,
}

impl TrackedItem for PullRequest {
    type Key = i64;

    const TABLE: &'static str = "github_pull_requests";
    const KEY_COLUMN: &'static str = "pull_request";
    const COLUMNS: &'static str = "id, pull_request, title, description, status, repository, url, is_assigned, created_at, updated_at";

    fn key(&self) -> i64 {
        self.pull_request
    }

    fn same_content(&self, other: &Self) -> bool {
        self.pull_request == other.pull_request
            && self.title == other.title
            && self.description == other.description
            && self.status == other.status
            && self.repository == other.repository
            && self.url == other.url
            && self.is_assigned == other.is_assigned
            && self.updated_at == other.updated_at
    }

    fn insert_query(&self) -> SqliteQuery<'_> {
        sqlx::query(
            r#"
            INSERT INTO github_pull_requests (
                id, pull_request, title, description, status, repository, url,
                is_assigned, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(self.pull_request)
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.status)
        .bind(&self.repository)
        .bind(&self.url)
        .bind(self.is_assigned)
        .bind(self.created_at)
        .bind(self.updated_at)
    }

    fn update_query(&self) -> SqliteQuery<'_> {
        sqlx::query(
            r#"
            UPDATE github_pull_requests SET
                title = ?,
                description = ?,
                status = ?,
                repository = ?,
                url = ?,
                is_assigned = ?,
                updated_at = ?
            WHERE pull_request = ?
            "#,
        )
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.status)
        .bind(&self.repository)
        .bind(&self.url)
        .bind(self.is_assigned)
        .bind(self.updated_at)
        .bind(self.pull_request)
    }
}

//! GitLab merge request model.

use crate::db::tracked::{SqliteQuery, TrackedItem};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An open GitLab merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MergeRequest {
    /// Local row ID (UUID v4), stable across syncs.
    pub id: String,

    /// Project-scoped MR number (`iid`).
    pub merge_request: i64,

    /// MR title.
    pub title: String,

    /// MR description (Markdown).
    pub description: String,

    /// GitLab state, e.g. `opened`.
    pub status: String,

    /// Project path with namespace (e.g., "group/project").
    pub repository: String,

    /// URL to MR in GitLab web UI.
    pub url: String,

    /// MR creation timestamp (Unix).
    pub created_at: i64,

    /// MR last update timestamp (Unix).
    pub updated_at: i64,
}

impl TrackedItem for MergeRequest {
    type Key = i64;

    const TABLE: &'static str = "gitlab_merge_requests";
    const KEY_COLUMN: &'static str = "merge_request";
    const COLUMNS: &'static str =
        "id, merge_request, title, description, status, repository, url, created_at, updated_at";

    fn key(&self) -> i64 {
        self.merge_request
    }

    fn same_content(&self, other: &Self) -> bool {
        self.merge_request == other.merge_request
            && self.title == other.title
            && self.description == other.description
            && self.status == other.status
            && self.repository == other.repository
            && self.url == other.url
            && self.updated_at == other.updated_at
    }

    fn insert_query(&self) -> SqliteQuery<'_> {
        sqlx::query(
            r#"
            INSERT INTO gitlab_merge_requests (
                id, merge_request, title, description, status, repository, url,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(self.merge_request)
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.status)
        .bind(&self.repository)
        .bind(&self.url)
        .bind(self.created_at)
        .bind(self.updated_at)
    }

    fn update_query(&self) -> SqliteQuery<'_> {
        sqlx::query(
            r#"
            UPDATE gitlab_merge_requests SET
                title = ?,
                description = ?,
                status = ?,
                repository = ?,
                url = ?,
                updated_at = ?
            WHERE merge_request = ?
            "#,
        )
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.status)
        .bind(&self.repository)
        .bind(&self.url)
        .bind(self.updated_at)
        .bind(self.merge_request)
    }
}

//! Jira issue model.

use crate::db::tracked::{SqliteQuery, TrackedItem};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An unresolved Jira issue assigned to the configured account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Issue {
    /// Local row ID (UUID v4), stable across syncs.
    pub id: String,

    /// Issue key, e.g. `OPS-42`.
    pub issue: String,

    /// Issue summary.
    pub title: String,

    /// REST link to the issue (`self` in the Jira payload).
    pub description: String,

    /// Workflow status name, e.g. `In Progress`.
    pub status: String,

    /// Browser URL (`{site}/browse/{key}`).
    pub url: String,

    pub created_at: i64,
    pub updated_at: i64,
}

impl TrackedItem for Issue {
    type Key = String;

    const TABLE: &'static str = "jira_issues";
    const KEY_COLUMN: &'static str = "issue";
    const COLUMNS: &'static str = "id, issue, title, description, status, url, created_at, updated_at";

    fn key(&self) -> String {
        self.issue.clone()
    }

    fn same_content(&self, other: &Self) -> bool {
        self.issue == other.issue
            && self.title == other.title
            && self.description == other.description
            && self.status == other.status
            && self.url == other.url
            && self.updated_at == other.updated_at
    }

    fn insert_query(&self) -> SqliteQuery<'_> {
        sqlx::query(
            r#"
            INSERT INTO jira_issues (id, issue, title, description, status, url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.issue)
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.status)
        .bind(&self.url)
        .bind(self.created_at)
        .bind(self.updated_at)
    }

    fn update_query(&self) -> SqliteQuery<'_> {
        sqlx::query(
            r#"
            UPDATE jira_issues SET
                title = ?,
                description = ?,
                status = ?,
                url = ?,
                updated_at = ?
            WHERE issue = ?
            "#,
        )
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.status)
        .bind(&self.url)
        .bind(self.updated_at)
        .bind(&self.issue)
    }
}

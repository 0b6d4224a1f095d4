//! Data models for the application.
//!
//! These models represent the entities stored in the local SQLite database
//! and returned by the HTTP API.

pub mod issue;
pub mod merge_request;
pub mod pull_request;
pub mod settings;

// Re-exports for convenient access
pub use issue::Issue;
pub use merge_request::MergeRequest;
pub use pull_request::PullRequest;
pub use settings::{Settings, SettingsField, SettingsResponse, SettingsUpdate};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generate a fresh local row ID.
pub fn new_row_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A remote tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    GitHub,
    GitLab,
    Jira,
}

impl Provider {
    /// Lowercase name used in logs and error payloads.
    pub fn name(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::Jira => "jira",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Response body for `GET /pull-requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestList {
    pub pull_requests: Vec<PullRequest>,
    pub count: usize,
}

impl From<Vec<PullRequest>> for PullRequestList {
    fn from(pull_requests: Vec<PullRequest>) -> Self {
        Self {
            count: pull_requests.len(),
            pull_requests,
        }
    }
}

/// Response body for `GET /merge-requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequestList {
    pub merge_requests: Vec<MergeRequest>,
    pub count: usize,
}

impl From<Vec<MergeRequest>> for MergeRequestList {
    fn from(merge_requests: Vec<MergeRequest>) -> Self {
        Self {
            count: merge_requests.len(),
            merge_requests,
        }
    }
}

/// Response body for `GET /issues`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueList {
    pub issues: Vec<Issue>,
    pub count: usize,
}

impl From<Vec<Issue>> for IssueList {
    fn from(issues: Vec<Issue>) -> Self {
        Self {
            count: issues.len(),
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names() {
        assert_eq!(Provider::GitHub.to_string(), "github");
        assert_eq!(Provider::GitLab.to_string(), "gitlab");
        assert_eq!(Provider::Jira.to_string(), "jira");
    }

    #[test]
    fn test_row_ids_are_unique() {
        assert_ne!(new_row_id(), new_row_id());
    }

    #[test]
    fn test_list_counts_items() {
        let list = IssueList::from(Vec::new());
        assert_eq!(list.count, 0);

        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["issues"], serde_json::json!([]));
        assert_eq!(json["count"], 0);
    }
}

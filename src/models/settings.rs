//! Provider settings singleton.
//!
//! One row holds every credential and endpoint the connectors need. The
//! updatable fields are enumerated by [`SettingsField`]; anything else is
//! rejected when an update is deserialized.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Stored provider settings.
///
/// Every field is optional: the row is created by the first update and each
/// connector checks for the fields it needs before calling out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Settings {
    /// Display name of the person whose work is tracked.
    pub user_name: Option<String>,

    /// GitHub personal access token (bearer).
    pub github_access_token: Option<String>,

    /// GitHub organization whose repositories are scanned.
    pub github_org: Option<String>,

    /// GitHub login used for the author/reviewer filter.
    pub github_user: Option<String>,

    /// GitHub GraphQL endpoint override.
    pub github_api_url: Option<String>,

    /// GitLab personal access token (bearer).
    pub gitlab_access_token: Option<String>,

    /// GitLab API base, e.g. `https://gitlab.com/api/v4`.
    pub gitlab_api_url: Option<String>,

    /// GitLab username used for the author/reviewer/assignee filter.
    pub gitlab_user: Option<String>,

    /// Jira account email (basic auth user).
    pub jira_api_email: Option<String>,

    /// Jira API token (basic auth password).
    pub jira_api_key: Option<String>,

    /// Jira REST base, e.g. `https://acme.atlassian.net/rest/api/2/`.
    pub jira_api_url: Option<String>,
}

/// Every settings field that can be read or updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    UserName,
    GithubAccessToken,
    GithubOrg,
    GithubUser,
    GithubApiUrl,
    GitlabAccessToken,
    GitlabApiUrl,
    GitlabUser,
    JiraApiEmail,
    JiraApiKey,
    JiraApiUrl,
}

impl SettingsField {
    /// All fields, in column order.
    pub const ALL: [SettingsField; 11] = [
        Self::UserName,
        Self::GithubAccessToken,
        Self::GithubOrg,
        Self::GithubUser,
        Self::GithubApiUrl,
        Self::GitlabAccessToken,
        Self::GitlabApiUrl,
        Self::GitlabUser,
        Self::JiraApiEmail,
        Self::JiraApiKey,
        Self::JiraApiUrl,
    ];

    /// Column name in the `settings` table (also the JSON key).
    pub fn column(self) -> &'static str {
        match self {
            Self::UserName => "user_name",
            Self::GithubAccessToken => "github_access_token",
            Self::GithubOrg => "github_org",
            Self::GithubUser => "github_user",
            Self::GithubApiUrl => "github_api_url",
            Self::GitlabAccessToken => "gitlab_access_token",
            Self::GitlabApiUrl => "gitlab_api_url",
            Self::GitlabUser => "gitlab_user",
            Self::JiraApiEmail => "jira_api_email",
            Self::JiraApiKey => "jira_api_key",
            Self::JiraApiUrl => "jira_api_url",
        }
    }
}

impl fmt::Display for SettingsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for SettingsField {
    type Err = AppError;

    /// Unknown names are a programming error, not bad user input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.column() == s)
            .ok_or_else(|| AppError::internal(format!("Settings has no field '{}'", s)))
    }
}

impl Settings {
    /// Read a field's raw value.
    pub fn get(&self, field: SettingsField) -> Option<&str> {
        let value = match field {
            SettingsField::UserName => &self.user_name,
            SettingsField::GithubAccessToken => &self.github_access_token,
            SettingsField::GithubOrg => &self.github_org,
            SettingsField::GithubUser => &self.github_user,
            SettingsField::GithubApiUrl => &self.github_api_url,
            SettingsField::GitlabAccessToken => &self.gitlab_access_token,
            SettingsField::GitlabApiUrl => &self.gitlab_api_url,
            SettingsField::GitlabUser => &self.gitlab_user,
            SettingsField::JiraApiEmail => &self.jira_api_email,
            SettingsField::JiraApiKey => &self.jira_api_key,
            SettingsField::JiraApiUrl => &self.jira_api_url,
        };
        value.as_deref()
    }

    /// Read a field by name.
    ///
    /// Fails with an internal error when the name is not a settings field.
    pub fn field(&self, name: &str) -> Result<Option<&str>, AppError> {
        let field = name.parse::<SettingsField>()?;
        Ok(self.get(field))
    }

    /// Read a field that is set and non-blank.
    pub fn non_empty(&self, field: SettingsField) -> Option<&str> {
        self.get(field).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Read a field a connector cannot work without.
    ///
    /// Missing or blank values fail with a configuration error naming the
    /// provider and the field.
    pub fn require(&self, field: SettingsField, provider: &str) -> Result<&str, AppError> {
        self.non_empty(field).ok_or_else(|| {
            AppError::configuration_for(
                provider,
                format!("{} settings are incomplete: '{}' is not set", provider, field),
            )
        })
    }
}

/// A partial settings update.
///
/// Keys not listed here are rejected during deserialization. A `null` value
/// counts as "not provided"; an empty string clears the field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsUpdate {
    pub user_name: Option<String>,
    pub github_access_token: Option<String>,
    pub github_org: Option<String>,
    pub github_user: Option<String>,
    pub github_api_url: Option<String>,
    pub gitlab_access_token: Option<String>,
    pub gitlab_api_url: Option<String>,
    pub gitlab_user: Option<String>,
    pub jira_api_email: Option<String>,
    pub jira_api_key: Option<String>,
    pub jira_api_url: Option<String>,
}

impl SettingsUpdate {
    /// The provided fields with their new values, in column order.
    pub fn provided(&self) -> Vec<(SettingsField, &str)> {
        SettingsField::ALL
            .into_iter()
            .filter_map(|field| self.value(field).map(|v| (field, v)))
            .collect()
    }

    /// Whether no field is provided.
    pub fn is_empty(&self) -> bool {
        self.provided().is_empty()
    }

    fn value(&self, field: SettingsField) -> Option<&str> {
        let value = match field {
            SettingsField::UserName => &self.user_name,
            SettingsField::GithubAccessToken => &self.github_access_token,
            SettingsField::GithubOrg => &self.github_org,
            SettingsField::GithubUser => &self.github_user,
            SettingsField::GithubApiUrl => &self.github_api_url,
            SettingsField::GitlabAccessToken => &self.gitlab_access_token,
            SettingsField::GitlabApiUrl => &self.gitlab_api_url,
            SettingsField::GitlabUser => &self.gitlab_user,
            SettingsField::JiraApiEmail => &self.jira_api_email,
            SettingsField::JiraApiKey => &self.jira_api_key,
            SettingsField::JiraApiUrl => &self.jira_api_url,
        };
        value.as_deref()
    }
}

/// Settings as returned by the read API (secrets omitted).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsResponse {
    pub user_name: Option<String>,
    pub github_org: Option<String>,
    pub github_user: Option<String>,
    pub github_api_url: Option<String>,
    pub has_github_token: bool,
    pub gitlab_api_url: Option<String>,
    pub gitlab_user: Option<String>,
    pub has_gitlab_token: bool,
    pub jira_api_email: Option<String>,
    pub jira_api_url: Option<String>,
    pub has_jira_key: bool,
}

impl From<Settings> for SettingsResponse {
    fn from(settings: Settings) -> Self {
        let has_github_token = settings.non_empty(SettingsField::GithubAccessToken).is_some();
        let has_gitlab_token = settings.non_empty(SettingsField::GitlabAccessToken).is_some();
        let has_jira_key = settings.non_empty(SettingsField::JiraApiKey).is_some();

        Self {
            user_name: settings.user_name,
            github_org: settings.github_org,
            github_user: settings.github_user,
            github_api_url: settings.github_api_url,
            has_github_token,
            gitlab_api_url: settings.gitlab_api_url,
            gitlab_user: settings.gitlab_user,
            has_gitlab_token,
            jira_api_email: settings.jira_api_email,
            jira_api_url: settings.jira_api_url,
            has_jira_key,
        }
    }
}

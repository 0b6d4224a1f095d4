//! Jira REST client and issue connector.

use crate::error::AppError;
use crate::models::{new_row_id, Issue, Provider, Settings, SettingsField};
use crate::services::remote::{self, ApiResponse, PAGE_SIZE};
use crate::services::sync_engine::{Connector, RemoteSnapshot};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

/// Open issues assigned to the authenticated account.
pub const ASSIGNED_OPEN_JQL: &str = "assignee=currentUser() AND statusCategory!=Done";

const SEARCH_FIELDS: &str = "summary,status,created,updated";

/// Jira API client configuration.
#[derive(Debug, Clone)]
pub struct JiraClientConfig {
    /// REST base URL (e.g., `https://acme.atlassian.net/rest/api/2/`).
    pub api_url: String,

    /// Account email.
    pub email: String,

    /// API token.
    pub api_key: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Jira REST client.
#[derive(Debug, Clone)]
pub struct JiraClient {
    client: Client,
    config: JiraClientConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuery<'a> {
    jql: &'a str,
    fields: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

/// Issue as returned by `/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct JiraIssue {
    pub key: String,

    /// REST link to the issue.
    #[serde(rename = "self")]
    pub self_link: String,

    pub fields: JiraIssueFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraIssueFields {
    pub summary: String,
    pub status: JiraStatus,
    pub created: String,
    pub updated: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraStatus {
    pub name: String,
}

/// Site base used for browse links: everything before `/rest/`.
pub fn site_base(api_url: &str) -> &str {
    let trimmed = api_url.trim_end_matches('/');
    trimmed
        .find("/rest/")
        .map_or(trimmed, |idx| &trimmed[..idx])
}

impl JiraIssue {
    fn into_row(self, site: &str) -> Result<Issue, AppError> {
        Ok(Issue {
            id: new_row_id(),
            url: format!("{}/browse/{}", site, self.key),
            created_at: remote::parse_timestamp(&self.fields.created)?,
            updated_at: remote::parse_timestamp(&self.fields.updated)?,
            issue: self.key,
            title: self.fields.summary,
            description: self.self_link,
            status: self.fields.status.name,
        })
    }
}

impl JiraClient {
    /// Create a new Jira client using basic authentication.
    pub fn new(config: JiraClientConfig) -> Result<Self, AppError> {
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", config.email, config.api_key));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            remote::authorization("Basic", &credentials)?,
        );
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = remote::build_client(headers, config.timeout_secs)?;
        Ok(Self { client, config })
    }

    /// Run a JQL search, returning at most one page.
    pub async fn search(&self, jql: &str) -> Result<ApiResponse<Vec<JiraIssue>>, AppError> {
        let endpoint = "/search";
        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), endpoint);

        let response = self
            .client
            .get(url)
            .query(&SearchQuery {
                jql,
                fields: SEARCH_FIELDS,
                max_results: PAGE_SIZE,
            })
            .send()
            .await?;

        Ok(
            match remote::handle_response::<SearchResponse>(response, endpoint).await? {
                ApiResponse::Data(body) => ApiResponse::Data(body.issues),
                ApiResponse::RateLimited(message) => ApiResponse::RateLimited(message),
            },
        )
    }
}

/// Reconciliation source for `jira_issues`.
#[derive(Debug, Clone)]
pub struct JiraConnector {
    timeout_secs: u64,
}

impl JiraConnector {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl Connector for JiraConnector {
    type Item = Issue;

    fn provider(&self) -> Provider {
        Provider::Jira
    }

    async fn fetch(&self, settings: &Settings) -> Result<RemoteSnapshot<Issue>, AppError> {
        let name = self.provider().name();
        let email = settings.require(SettingsField::JiraApiEmail, name)?;
        let api_key = settings.require(SettingsField::JiraApiKey, name)?;
        let api_url = settings.require(SettingsField::JiraApiUrl, name)?;

        let client = JiraClient::new(JiraClientConfig {
            api_url: api_url.to_string(),
            email: email.to_string(),
            api_key: api_key.to_string(),
            timeout_secs: self.timeout_secs,
        })?;

        let issues = match client.search(ASSIGNED_OPEN_JQL).await? {
            ApiResponse::Data(issues) => issues,
            ApiResponse::RateLimited(message) => return Ok(RemoteSnapshot::RateLimited(message)),
        };

        let site = site_base(api_url);
        issues
            .into_iter()
            .map(|issue| issue.into_row(site))
            .collect::<Result<Vec<_>, _>>()
            .map(RemoteSnapshot::Fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_base() {
        assert_eq!(
            site_base("https://acme.atlassian.net/rest/api/2/"),
            "https://acme.atlassian.net"
        );
        assert_eq!(
            site_base("https://jira.acme.io/tools/rest/api/latest"),
            "https://jira.acme.io/tools"
        );
        assert_eq!(site_base("https://jira.acme.io/"), "https://jira.acme.io");
    }

    #[test]
    fn test_into_row() {
        let issue: JiraIssue = serde_json::from_value(serde_json::json!({
            "id": "10001",
            "key": "OPS-12",
            "self": "https://acme.atlassian.net/rest/api/2/issue/10001",
            "fields": {
                "summary": "Rotate certificates",
                "status": { "name": "In Progress", "id": "3" },
                "created": "2024-01-15T10:30:00.000+0000",
                "updated": "2024-01-15T11:30:00.000+0000"
            }
        }))
        .unwrap();

        let row = issue.into_row("https://acme.atlassian.net").unwrap();
        assert_eq!(row.issue, "OPS-12");
        assert_eq!(row.url, "https://acme.atlassian.net/browse/OPS-12");
        assert_eq!(row.description, "https://acme.atlassian.net/rest/api/2/issue/10001");
        assert_eq!(row.status, "In Progress");
        assert_eq!(row.created_at, 1_705_314_600);
        assert_eq!(row.updated_at, 1_705_318_200);
    }

    #[test]
    fn test_search_query_params() {
        let query = SearchQuery {
            jql: ASSIGNED_OPEN_JQL,
            fields: SEARCH_FIELDS,
            max_results: PAGE_SIZE,
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["maxResults"], 100);
        assert_eq!(json["fields"], "summary,status,created,updated");
    }

    #[tokio::test]
    async fn test_fetch_requires_credentials() {
        let settings = Settings {
            jira_api_url: Some("https://acme.atlassian.net/rest/api/2/".into()),
            jira_api_email: Some("ada@acme.io".into()),
            ..Default::default()
        };

        let err = JiraConnector::new(5).fetch(&settings).await.unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }
}

//! GitLab API client and merge request connector.
//!
//! Lists open merge requests through API v4 with bearer authentication.

use crate::error::AppError;
use crate::models::{new_row_id, MergeRequest, Provider, Settings, SettingsField};
use crate::services::remote::{self, ApiResponse, PAGE_SIZE};
use crate::services::sync_engine::{Connector, RemoteSnapshot};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

/// GitLab API client configuration.
#[derive(Debug, Clone)]
pub struct GitLabClientConfig {
    /// API base URL (e.g., `https://gitlab.com/api/v4`).
    pub api_url: String,

    /// Personal access token for authentication.
    pub token: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// GitLab API client.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    client: Client,
    config: GitLabClientConfig,
}

/// Query parameters for listing merge requests.
#[derive(Debug, Clone, Serialize)]
pub struct MergeRequestsQuery {
    /// Filter by state: `opened`, `merged`, `closed`, `all`.
    pub state: &'static str,

    /// Items per page.
    pub per_page: u32,
}

impl Default for MergeRequestsQuery {
    fn default() -> Self {
        Self {
            state: "opened",
            per_page: PAGE_SIZE,
        }
    }
}

/// GitLab merge request from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabMergeRequest {
    pub iid: i64,
    pub title: String,
    pub description: Option<String>,
    pub state: String,
    pub web_url: String,
    pub created_at: String,
    pub updated_at: String,
    pub references: GitLabReferences,
    pub author: Option<GitLabUser>,
}

/// Textual references to a merge request.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabReferences {
    /// e.g. `acme/widgets!42`
    pub full: String,
}

/// GitLab user from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUser {
    pub username: String,
}

impl GitLabMergeRequest {
    /// Project path, taken from the full reference.
    pub fn repository(&self) -> &str {
        self.references
            .full
            .split_once('!')
            .map_or(self.references.full.as_str(), |(project, _)| project)
    }

    /// Whether `username` authored this MR.
    ///
    /// The listing uses the API's default scope, which only returns MRs
    /// created by the token owner, so authorship is the only relation left
    /// to narrow on.
    pub fn is_authored_by(&self, username: &str) -> bool {
        self.author
            .as_ref()
            .is_some_and(|u| u.username.eq_ignore_ascii_case(username))
    }

    fn into_row(self) -> Result<MergeRequest, AppError> {
        Ok(MergeRequest {
            id: new_row_id(),
            merge_request: self.iid,
            created_at: remote::parse_timestamp(&self.created_at)?,
            updated_at: remote::parse_timestamp(&self.updated_at)?,
            repository: self.repository().to_string(),
            title: self.title,
            description: self.description.unwrap_or_default(),
            status: self.state,
            url: self.web_url,
        })
    }
}

impl GitLabClient {
    /// Create a new GitLab client.
    pub fn new(config: GitLabClientConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            remote::authorization("Bearer", &config.token)?,
        );

        let client = remote::build_client(headers, config.timeout_secs)?;
        Ok(Self { client, config })
    }

    /// Build the full API URL for an endpoint.
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), endpoint)
    }

    /// List open merge requests in the token owner's default scope.
    pub async fn open_merge_requests(
        &self,
    ) -> Result<ApiResponse<Vec<GitLabMergeRequest>>, AppError> {
        let endpoint = "/merge_requests";
        let response = self
            .client
            .get(self.api_url(endpoint))
            .query(&MergeRequestsQuery::default())
            .send()
            .await?;

        remote::handle_response(response, endpoint).await
    }
}

/// Reconciliation source for `gitlab_merge_requests`.
#[derive(Debug, Clone)]
pub struct GitLabConnector {
    timeout_secs: u64,
}

impl GitLabConnector {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl Connector for GitLabConnector {
    type Item = MergeRequest;

    fn provider(&self) -> Provider {
        Provider::GitLab
    }

    async fn fetch(&self, settings: &Settings) -> Result<RemoteSnapshot<MergeRequest>, AppError> {
        let name = self.provider().name();
        let token = settings.require(SettingsField::GitlabAccessToken, name)?;
        let api_url = settings.require(SettingsField::GitlabApiUrl, name)?;
        let user = settings.non_empty(SettingsField::GitlabUser);

        let client = GitLabClient::new(GitLabClientConfig {
            api_url: api_url.to_string(),
            token: token.to_string(),
            timeout_secs: self.timeout_secs,
        })?;

        let merge_requests = match client.open_merge_requests().await? {
            ApiResponse::Data(mrs) => mrs,
            ApiResponse::RateLimited(message) => return Ok(RemoteSnapshot::RateLimited(message)),
        };

        merge_requests
            .into_iter()
            .filter(|mr| user.map_or(true, |u| mr.is_authored_by(u)))
            .map(GitLabMergeRequest::into_row)
            .collect::<Result<Vec<_>, _>>()
            .map(RemoteSnapshot::Fresh)
    }
}

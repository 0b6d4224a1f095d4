//! GitHub GraphQL client and pull request connector.
//!
//! One query lists the open pull requests of every repository in the
//! configured organization; the connector keeps those the configured user
//! authored or was asked to review.

use crate::error::AppError;
use crate::models::{new_row_id, Provider, PullRequest, Settings, SettingsField};
use crate::services::remote::{self, ApiResponse};
use crate::services::sync_engine::{Connector, RemoteSnapshot};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

/// Public GitHub GraphQL endpoint, used when no override is configured.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com/graphql";

const OPEN_PULL_REQUESTS_QUERY: &str = r#"
query($org: String!) {
  organization(login: $org) {
    repositories(first: 100) {
      nodes {
        name
        pullRequests(states: OPEN, first: 100) {
          nodes {
            number
            title
            body
            state
            url
            createdAt
            updatedAt
            author {
              login
            }
            reviewRequests(first: 10) {
              nodes {
                requestedReviewer {
                  ... on User {
                    login
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// GitHub API client configuration.
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    /// GraphQL endpoint URL.
    pub api_url: String,

    /// Personal access token for authentication.
    pub token: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// GitHub GraphQL client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubClientConfig,
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: OrgVariables<'a>,
}

#[derive(Serialize)]
struct OrgVariables<'a> {
    org: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<OrganizationData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganizationData {
    organization: Option<Organization>,
}

#[derive(Debug, Deserialize)]
struct Organization {
    repositories: Nodes<GitHubRepository>,
}

/// A GraphQL connection; GitHub may return `null` entries in `nodes`.
#[derive(Debug, Deserialize)]
pub struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

impl<T> Nodes<T> {
    fn into_items(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }

    fn items(&self) -> impl Iterator<Item = &T> {
        self.nodes.iter().flatten()
    }
}

/// Repository with its open pull requests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubRepository {
    pub name: String,
    pull_requests: Nodes<GitHubPullRequest>,
}

/// Pull request as returned by the GraphQL query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubPullRequest {
    pub number: i64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
    /// `null` when the author account was deleted.
    pub author: Option<GitHubActor>,
    review_requests: Nodes<ReviewRequest>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubActor {
    pub login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest {
    /// Teams match the query's `... on User` fragment as an empty object.
    requested_reviewer: Option<RequestedReviewer>,
}

#[derive(Debug, Deserialize)]
struct RequestedReviewer {
    login: Option<String>,
}

impl GitHubPullRequest {
    fn is_authored_by(&self, user: &str) -> bool {
        self.author
            .as_ref()
            .is_some_and(|a| a.login.eq_ignore_ascii_case(user))
    }

    fn is_review_requested_from(&self, user: &str) -> bool {
        self.review_requests.items().any(|rr| {
            rr.requested_reviewer
                .as_ref()
                .and_then(|r| r.login.as_deref())
                .is_some_and(|login| login.eq_ignore_ascii_case(user))
        })
    }
}

impl GitHubClient {
    /// Create a new GitHub client.
    pub fn new(config: GitHubClientConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            remote::authorization("Bearer", &config.token)?,
        );
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = remote::build_client(headers, config.timeout_secs)?;
        Ok(Self { client, config })
    }

    /// Fetch every repository of `org` with its open pull requests.
    ///
    /// GraphQL reports most failures with HTTP 200 and an `errors` array, so
    /// those are checked here as well as the HTTP status.
    pub async fn open_pull_requests(
        &self,
        org: &str,
    ) -> Result<ApiResponse<Vec<GitHubRepository>>, AppError> {
        let request = GraphQlRequest {
            query: OPEN_PULL_REQUESTS_QUERY,
            variables: OrgVariables { org },
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .json(&request)
            .send()
            .await?;

        let body = match remote::handle_response::<GraphQlResponse>(response, "graphql").await? {
            ApiResponse::Data(body) => body,
            ApiResponse::RateLimited(message) => return Ok(ApiResponse::RateLimited(message)),
        };

        if !body.errors.is_empty() {
            let rate_limited = body.errors.iter().any(|e| {
                e.kind.as_deref() == Some("RATE_LIMITED") || remote::mentions_rate_limit(&e.message)
            });
            let message = body
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");

            if rate_limited {
                return Ok(ApiResponse::RateLimited(message));
            }
            return Err(AppError::remote_api(format!("GraphQL query failed: {}", message)));
        }

        let organization = body
            .data
            .and_then(|d| d.organization)
            .ok_or_else(|| AppError::remote_api(format!("Organization '{}' not found", org)))?;

        Ok(ApiResponse::Data(organization.repositories.into_items().collect()))
    }
}

/// Keep the pull requests `user` authored or was asked to review, mapped to
/// local rows.
///
/// `is_assigned` is true only for authored pull requests.
pub fn relevant_pull_requests(
    repositories: Vec<GitHubRepository>,
    user: &str,
) -> Result<Vec<PullRequest>, AppError> {
    let mut relevant = Vec::new();

    for repository in repositories {
        for pr in repository.pull_requests.into_items() {
            let is_author = pr.is_authored_by(user);
            if !is_author && !pr.is_review_requested_from(user) {
                continue;
            }

            relevant.push(PullRequest {
                id: new_row_id(),
                pull_request: pr.number,
                created_at: remote::parse_timestamp(&pr.created_at)?,
                updated_at: remote::parse_timestamp(&pr.updated_at)?,
                title: pr.title,
                description: pr.body.unwrap_or_default(),
                status: pr.state,
                repository: repository.name.clone(),
                url: pr.url,
                is_assigned: is_author,
            });
        }
    }

    Ok(relevant)
}

/// Reconciliation source for `github_pull_requests`.
#[derive(Debug, Clone)]
pub struct GitHubConnector {
    timeout_secs: u64,
}

impl GitHubConnector {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl Connector for GitHubConnector {
    type Item = PullRequest;

    fn provider(&self) -> Provider {
        Provider::GitHub
    }

    async fn fetch(&self, settings: &Settings) -> Result<RemoteSnapshot<PullRequest>, AppError> {
        let name = self.provider().name();
        let token = settings.require(SettingsField::GithubAccessToken, name)?;
        let org = settings.require(SettingsField::GithubOrg, name)?;
        let user = settings.require(SettingsField::GithubUser, name)?;
        let api_url = settings
            .non_empty(SettingsField::GithubApiUrl)
            .unwrap_or(DEFAULT_GITHUB_API_URL);

        let client = GitHubClient::new(GitHubClientConfig {
            api_url: api_url.to_string(),
            token: token.to_string(),
            timeout_secs: self.timeout_secs,
        })?;

        match client.open_pull_requests(org).await? {
            ApiResponse::Data(repositories) => Ok(RemoteSnapshot::Fresh(relevant_pull_requests(
                repositories,
                user,
            )?)),
            ApiResponse::RateLimited(message) => Ok(RemoteSnapshot::RateLimited(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repositories(json: serde_json::Value) -> Vec<GitHubRepository> {
        serde_json::from_value(json).unwrap()
    }

    fn pr_json(number: i64, author: Option<&str>, reviewers: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "number": number,
            "title": format!("PR {}", number),
            "body": null,
            "state": "OPEN",
            "url": format!("https://github.com/acme/widgets/pull/{}", number),
            "createdAt": "2024-01-15T10:30:00Z",
            "updatedAt": "2024-01-16T10:30:00Z",
            "author": author.map(|login| serde_json::json!({ "login": login })),
            "reviewRequests": {
                "nodes": reviewers
                    .iter()
                    .map(|login| serde_json::json!({ "requestedReviewer": { "login": login } }))
                    .chain(std::iter::once(serde_json::json!({ "requestedReviewer": {} })))
                    .collect::<Vec<_>>()
            }
        })
    }

    #[test]
    fn test_relevance_filter() {
        let repos = repositories(serde_json::json!([
            {
                "name": "widgets",
                "pullRequests": { "nodes": [
                    pr_json(1, Some("octocat"), &[]),
                    pr_json(2, Some("hubot"), &["OctoCat"]),
                    pr_json(3, Some("hubot"), &["someone"]),
                    pr_json(4, None, &[]),
                    null
                ]}
            },
            {
                "name": "gadgets",
                "pullRequests": { "nodes": [] }
            }
        ]));

        let prs = relevant_pull_requests(repos, "octocat").unwrap();
        let summary: Vec<(i64, bool)> = prs.iter().map(|p| (p.pull_request, p.is_assigned)).collect();
        assert_eq!(summary, vec![(1, true), (2, false)]);

        let first = &prs[0];
        assert_eq!(first.repository, "widgets");
        assert_eq!(first.description, "");
        assert_eq!(first.status, "OPEN");
        assert!(first.updated_at > first.created_at);
    }

    #[test]
    fn test_bad_timestamp_fails_the_pass() {
        let mut pr = pr_json(1, Some("octocat"), &[]);
        pr["createdAt"] = serde_json::json!("not a date");
        let repos = repositories(serde_json::json!([
            { "name": "widgets", "pullRequests": { "nodes": [pr] } }
        ]));

        let err = relevant_pull_requests(repos, "octocat").unwrap_err();
        assert!(matches!(err, AppError::RemoteApi { .. }));
    }

    #[test]
    fn test_missing_nodes_deserialize_as_empty() {
        let repos = repositories(serde_json::json!([
            { "name": "widgets", "pullRequests": {} },
            {
                "name": "gadgets",
                "pullRequests": { "nodes": [{
                    "number": 9,
                    "title": "No reviewers",
                    "body": "text",
                    "state": "OPEN",
                    "url": "https://github.com/acme/gadgets/pull/9",
                    "createdAt": "2024-01-15T10:30:00Z",
                    "updatedAt": "2024-01-15T10:30:00Z",
                    "author": { "login": "octocat" },
                    "reviewRequests": {}
                }]}
            }
        ]));

        assert_eq!(repos[0].pull_requests.items().count(), 0);

        let prs = relevant_pull_requests(repos, "octocat").unwrap();
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].repository, "gadgets");
        assert_eq!(prs[0].description, "text");
    }

    #[tokio::test]
    async fn test_fetch_requires_settings() {
        let connector = GitHubConnector::new(5);
        let settings = Settings {
            github_access_token: Some("token".into()),
            github_org: Some("acme".into()),
            ..Default::default()
        };

        let err = connector.fetch(&settings).await.unwrap_err();
        match err {
            AppError::Configuration { message, .. } => assert!(message.contains("github_user")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

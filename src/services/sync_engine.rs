//! Reconciliation engine.
//!
//! A pass for one provider:
//! - loads the settings row and hands it to the provider's [`Connector`]
//! - fetches and filters the remote open items
//! - diffs them against the local table and applies the plan in one transaction
//! - re-reads the table after commit
//!
//! Passes for the same provider are serialized; different providers run in
//! parallel.

use crate::db::pool::DbPool;
use crate::db::{self, tracked, tracked::TrackedItem};
use crate::error::AppError;
use crate::models::{Issue, MergeRequest, Provider, PullRequest, Settings};
use crate::services::github_client::GitHubConnector;
use crate::services::gitlab_client::GitLabConnector;
use crate::services::jira_client::JiraConnector;
use crate::services::reconcile::ReconcilePlan;
use crate::services::remote::DEFAULT_TIMEOUT_SECS;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Remote state as seen by a connector.
#[derive(Debug)]
pub enum RemoteSnapshot<T> {
    /// Current open items, already filtered to the configured user.
    Fresh(Vec<T>),

    /// The remote refused to answer because of rate limiting.
    RateLimited(String),
}

/// A source of tracked items for one provider.
#[async_trait]
pub trait Connector: Send + Sync {
    type Item: TrackedItem;

    fn provider(&self) -> Provider;

    /// Fetch the remote open items relevant to the configured user.
    ///
    /// Fails with a configuration error before any network call when a
    /// required setting is missing.
    async fn fetch(&self, settings: &Settings) -> Result<RemoteSnapshot<Self::Item>, AppError>;
}

/// Row changes made by one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub deleted: u64,
}

/// Result of a pass: the local rows after it, and what changed.
#[derive(Debug)]
pub struct SyncOutcome<T> {
    pub items: Vec<T>,

    /// `None` when the remote was rate limited and nothing was applied.
    pub report: Option<ApplyReport>,
}

impl<T> SyncOutcome<T> {
    /// Whether the items are the previous snapshot rather than fresh data.
    pub fn is_degraded(&self) -> bool {
        self.report.is_none()
    }
}

#[derive(Debug, Default)]
struct ProviderLocks {
    github: Mutex<()>,
    gitlab: Mutex<()>,
    jira: Mutex<()>,
}

impl ProviderLocks {
    fn get(&self, provider: Provider) -> &Mutex<()> {
        match provider {
            Provider::GitHub => &self.github,
            Provider::GitLab => &self.gitlab,
            Provider::Jira => &self.jira,
        }
    }
}

/// Runs reconciliation passes against the local store.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    pool: DbPool,
    timeout_secs: u64,
    locks: Arc<ProviderLocks>,
}

impl SyncEngine {
    /// Create an engine whose outbound clients use `timeout_secs`.
    pub fn new(pool: DbPool, timeout_secs: u64) -> Self {
        Self {
            pool,
            timeout_secs,
            locks: Arc::new(ProviderLocks::default()),
        }
    }

    /// Create an engine with the default request timeout.
    pub fn with_default_timeout(pool: DbPool) -> Self {
        Self::new(pool, DEFAULT_TIMEOUT_SECS)
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Reconcile GitHub pull requests.
    pub async fn sync_pull_requests(&self) -> Result<SyncOutcome<PullRequest>, AppError> {
        self.reconcile(&GitHubConnector::new(self.timeout_secs)).await
    }

    /// Reconcile GitLab merge requests.
    pub async fn sync_merge_requests(&self) -> Result<SyncOutcome<MergeRequest>, AppError> {
        self.reconcile(&GitLabConnector::new(self.timeout_secs)).await
    }

    /// Reconcile Jira issues.
    pub async fn sync_issues(&self) -> Result<SyncOutcome<Issue>, AppError> {
        self.reconcile(&JiraConnector::new(self.timeout_secs)).await
    }

    /// Run one pass for `connector`'s provider.
    ///
    /// On a rate-limited fetch the stored rows are returned unchanged.
    pub async fn reconcile<C: Connector>(
        &self,
        connector: &C,
    ) -> Result<SyncOutcome<C::Item>, AppError> {
        let provider = connector.provider();
        let _guard = self.locks.get(provider).lock().await;
        let start = Instant::now();

        let settings = db::settings::get_settings(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::configuration_for(provider.name(), "Settings have not been configured")
            })?;

        let snapshot = connector
            .fetch(&settings)
            .await
            .map_err(|e| e.with_provider(provider.name()))?;

        let report = match snapshot {
            RemoteSnapshot::Fresh(remote) => {
                let fetched = remote.len();
                let report = self.apply(remote).await?;
                log::info!(
                    "{} sync: {} fetched, {} added, {} updated, {} unchanged, {} deleted in {}ms",
                    provider,
                    fetched,
                    report.added,
                    report.updated,
                    report.unchanged,
                    report.deleted,
                    start.elapsed().as_millis()
                );
                Some(report)
            }
            RemoteSnapshot::RateLimited(message) => {
                log::warn!(
                    "{} sync skipped, rate limited ({}); serving stored snapshot",
                    provider,
                    message
                );
                None
            }
        };

        let items = tracked::list_all::<C::Item>(&self.pool).await?;

        Ok(SyncOutcome { items, report })
    }

    /// Apply the remote set in a single transaction.
    ///
    /// The transaction takes the write lock up front. A deferred one would
    /// read first and then fail with `SQLITE_BUSY` when upgrading while
    /// another provider's pass holds the lock, without waiting on the busy
    /// timeout.
    async fn apply<T: TrackedItem>(&self, remote: Vec<T>) -> Result<ApplyReport, AppError> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        match apply_plan(&mut tx, remote).await {
            Ok(report) => {
                tx.commit().await.map_err(|e| {
                    AppError::persistence_with_op(e.to_string(), format!("commit {}", T::TABLE))
                })?;
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    log::error!("Rollback of {} failed: {}", T::TABLE, rollback_err);
                }
                Err(AppError::persistence_with_op(
                    e.to_string(),
                    format!("reconcile {}", T::TABLE),
                ))
            }
        }
    }
}

async fn apply_plan<T: TrackedItem>(
    conn: &mut SqliteConnection,
    remote: Vec<T>,
) -> Result<ApplyReport, sqlx::Error> {
    let local = tracked::local_keys::<T>(conn).await?;
    let plan = ReconcilePlan::build(local, remote);

    let stored: HashMap<T::Key, T> = tracked::find_by_keys::<T>(conn, &plan.update_keys())
        .await?
        .into_iter()
        .map(|item| (item.key(), item))
        .collect();

    let mut report = ApplyReport::default();

    for item in &plan.to_update {
        match stored.get(&item.key()) {
            Some(current) if current.same_content(item) => report.unchanged += 1,
            _ => {
                tracked::update(conn, item).await?;
                report.updated += 1;
            }
        }
    }

    for item in &plan.to_add {
        tracked::insert(conn, item).await?;
        report.added += 1;
    }

    report.deleted = tracked::delete_by_keys::<T>(conn, &plan.to_delete).await?;

    Ok(report)
}

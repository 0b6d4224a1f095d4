//! Process configuration.
//!
//! Only process-level knobs live here; provider credentials are stored in
//! the settings row and managed through the API.

use crate::services::remote::DEFAULT_TIMEOUT_SECS;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Work Radar: mirrors your open GitHub, GitLab and Jira work into a local store.
#[derive(Parser, Debug, Clone)]
#[command(name = "work-radar", version, about)]
pub struct ServerConfig {
    /// Address to bind the HTTP API to
    #[arg(long, env = "WORK_RADAR_LISTEN", default_value = "127.0.0.1:8000")]
    pub listen: SocketAddr,

    /// Path to the SQLite database file
    #[arg(long, env = "WORK_RADAR_DATABASE", default_value = "work-radar.db")]
    pub database: PathBuf,

    /// Timeout for requests to GitHub, GitLab and Jira, in seconds
    #[arg(
        long,
        env = "WORK_RADAR_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub http_timeout_secs: u64,
}

//! Command-line interface for the dbretry tool
//!
//! The binary inspects how the retry layer behaves under a given
//! configuration, without a live cluster:
//!
//! - `timeouts`: the resolved per-service deadline table
//! - `plan`: the decisions the orchestrator makes for a repeated failure
//! - `simulate`: concurrent requests sent through a scripted transport
//!
//! Global flags override values from the optional JSON configuration file.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::StrategyKind;
use crate::reason::RetryReason;
use crate::request::Service;
use crate::timeouts::TimeoutOverrides;

/// Main command-line interface structure for dbretry
///
/// Global options configure the client (timeouts and retry strategy) and
/// apply to every subcommand.
///
/// # Examples
///
/// ```
/// use clap::Parser;
/// use dbretry::cli::{Cli, Commands};
///
/// let cli = Cli::try_parse_from(["dbretry", "--query-timeout-ms", "30000", "timeouts"]).unwrap();
/// assert!(matches!(cli.command, Commands::Timeouts));
/// assert_eq!(cli.timeouts.query_timeout_ms, Some(30_000));
/// ```
#[derive(Parser)]
#[command(
    name = "dbretry",
    about = "Inspect request retry and timeout behaviour of the database client",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON configuration file with `timeouts` and `retry` sections
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Retry strategy for requests: best_effort or fail_fast
    #[arg(long, global = true)]
    pub strategy: Option<StrategyKind>,

    /// Ceiling of the best-effort exponential backoff in milliseconds
    #[arg(long, global = true)]
    pub backoff_cap_ms: Option<u64>,

    /// Number of simulated requests in flight at once
    #[arg(short = 'c', long, default_value = "16")]
    pub concurrent_requests: usize,

    #[command(flatten)]
    pub timeouts: TimeoutArgs,
}

/// Per-service timeout overrides in milliseconds
#[derive(Args, Debug, Default)]
pub struct TimeoutArgs {
    #[arg(long = "kv-timeout-ms", global = true)]
    pub key_value_timeout_ms: Option<u64>,

    #[arg(long = "kv-durable-timeout-ms", global = true)]
    pub key_value_durable_timeout_ms: Option<u64>,

    #[arg(long, global = true)]
    pub view_timeout_ms: Option<u64>,

    #[arg(long, global = true)]
    pub query_timeout_ms: Option<u64>,

    #[arg(long, global = true)]
    pub analytics_timeout_ms: Option<u64>,

    #[arg(long, global = true)]
    pub search_timeout_ms: Option<u64>,

    #[arg(long, global = true)]
    pub management_timeout_ms: Option<u64>,

    #[arg(long, global = true)]
    pub bucket_management_timeout_ms: Option<u64>,

    #[arg(long, global = true)]
    pub collection_management_timeout_ms: Option<u64>,
}

impl TimeoutArgs {
    pub fn to_overrides(&self) -> TimeoutOverrides {
        TimeoutOverrides {
            key_value_timeout_ms: self.key_value_timeout_ms,
            key_value_durable_timeout_ms: self.key_value_durable_timeout_ms,
            view_timeout_ms: self.view_timeout_ms,
            query_timeout_ms: self.query_timeout_ms,
            analytics_timeout_ms: self.analytics_timeout_ms,
            search_timeout_ms: self.search_timeout_ms,
            management_timeout_ms: self.management_timeout_ms,
            bucket_management_timeout_ms: self.bucket_management_timeout_ms,
            collection_management_timeout_ms: self.collection_management_timeout_ms,
        }
    }
}

/// Available subcommands
///
/// ```text
/// dbretry timeouts
/// dbretry plan --reason kv_locked --attempts 8
/// dbretry simulate --service kv --reason kv_not_my_vbucket --failures 3 --requests 10
/// ```
#[derive(Subcommand)]
pub enum Commands {
    /// Print the resolved per-service timeout table
    Timeouts,

    /// Print the orchestrator decisions for a repeatedly failing request
    ///
    /// Output stops at the first failure decision, since a failed request
    /// is never resent.
    Plan {
        /// Failure reason, e.g. kv_locked or socket_closed_while_in_flight
        #[arg(short, long)]
        reason: RetryReason,

        /// Target service
        #[arg(short, long, default_value = "kv")]
        service: Service,

        /// Treat the operation as not provably idempotent
        #[arg(long)]
        non_idempotent: bool,

        /// Number of consecutive failures to decide on
        #[arg(short, long, default_value = "8")]
        attempts: usize,
    },

    /// Send requests through a scripted transport that fails before answering
    Simulate {
        /// Target service
        #[arg(short, long, default_value = "kv")]
        service: Service,

        /// Operation name used in logs and results
        #[arg(short, long, default_value = "get")]
        operation: String,

        /// Failure reason reported by the transport
        #[arg(short, long)]
        reason: RetryReason,

        /// Failed attempts before each request succeeds
        #[arg(short, long, default_value = "3")]
        failures: usize,

        /// Number of requests to send
        #[arg(long, default_value = "1")]
        requests: usize,

        /// Treat the operation as not provably idempotent
        #[arg(long)]
        non_idempotent: bool,

        /// Duration of each scripted attempt in milliseconds
        #[arg(long, default_value = "1")]
        latency_ms: u64,

        /// Explicit per-request timeout in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },
}

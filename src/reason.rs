//! Classification of why an attempt failed
//!
//! Every failed attempt is mapped by the sender onto exactly one
//! [`RetryReason`]. Each reason carries two fixed policy hints:
//!
//! - `allows_non_idempotent_retry`: the server guarantees the attempt had no
//!   effect, so even non-idempotent operations may be resent
//! - `always_retry`: the failure is a routing or topology race; the request
//!   is retried on the controlled backoff schedule regardless of strategy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryReason {
    Unknown,
    SocketNotAvailable,
    ServiceNotAvailable,
    NodeNotAvailable,
    KvNotMyVbucket,
    KvCollectionOutdated,
    KvErrorMapRetryIndicated,
    KvLocked,
    KvTemporaryFailure,
    KvSyncWriteInProgress,
    KvSyncWriteReCommitInProgress,
    ServiceResponseCodeIndicated,
    SocketClosedWhileInFlight,
    CircuitBreakerOpen,
    QueryPreparedStatementFailure,
    QueryIndexNotFound,
    AnalyticsTemporaryFailure,
    SearchTooManyRequests,
    ViewsTemporaryFailure,
    ViewsNoActivePartition,
    BucketOpenInProgress,
    BucketNotAvailable,
    CollectionMapRefreshInProgress,
    GlobalConfigLoadInProgress,
}

impl RetryReason {
    pub const ALL: [RetryReason; 24] = [
        Self::Unknown,
        Self::SocketNotAvailable,
        Self::ServiceNotAvailable,
        Self::NodeNotAvailable,
        Self::KvNotMyVbucket,
        Self::KvCollectionOutdated,
        Self::KvErrorMapRetryIndicated,
        Self::KvLocked,
        Self::KvTemporaryFailure,
        Self::KvSyncWriteInProgress,
        Self::KvSyncWriteReCommitInProgress,
        Self::ServiceResponseCodeIndicated,
        Self::SocketClosedWhileInFlight,
        Self::CircuitBreakerOpen,
        Self::QueryPreparedStatementFailure,
        Self::QueryIndexNotFound,
        Self::AnalyticsTemporaryFailure,
        Self::SearchTooManyRequests,
        Self::ViewsTemporaryFailure,
        Self::ViewsNoActivePartition,
        Self::BucketOpenInProgress,
        Self::BucketNotAvailable,
        Self::CollectionMapRefreshInProgress,
        Self::GlobalConfigLoadInProgress,
    ];

    /// Whether a request that is not provably idempotent may be retried
    pub const fn allows_non_idempotent_retry(self) -> bool {
        !matches!(self, Self::Unknown | Self::SocketClosedWhileInFlight)
    }

    /// Whether the request must be retried on the controlled schedule,
    /// bypassing its configured strategy
    pub const fn always_retry(self) -> bool {
        matches!(
            self,
            Self::KvNotMyVbucket
                | Self::KvCollectionOutdated
                | Self::ViewsNoActivePartition
                | Self::BucketOpenInProgress
                | Self::BucketNotAvailable
                | Self::CollectionMapRefreshInProgress
                | Self::GlobalConfigLoadInProgress
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::SocketNotAvailable => "socket_not_available",
            Self::ServiceNotAvailable => "service_not_available",
            Self::NodeNotAvailable => "node_not_available",
            Self::KvNotMyVbucket => "kv_not_my_vbucket",
            Self::KvCollectionOutdated => "kv_collection_outdated",
            Self::KvErrorMapRetryIndicated => "kv_error_map_retry_indicated",
            Self::KvLocked => "kv_locked",
            Self::KvTemporaryFailure => "kv_temporary_failure",
            Self::KvSyncWriteInProgress => "kv_sync_write_in_progress",
            Self::KvSyncWriteReCommitInProgress => "kv_sync_write_re_commit_in_progress",
            Self::ServiceResponseCodeIndicated => "service_response_code_indicated",
            Self::SocketClosedWhileInFlight => "socket_closed_while_in_flight",
            Self::CircuitBreakerOpen => "circuit_breaker_open",
            Self::QueryPreparedStatementFailure => "query_prepared_statement_failure",
            Self::QueryIndexNotFound => "query_index_not_found",
            Self::AnalyticsTemporaryFailure => "analytics_temporary_failure",
            Self::SearchTooManyRequests => "search_too_many_requests",
            Self::ViewsTemporaryFailure => "views_temporary_failure",
            Self::ViewsNoActivePartition => "views_no_active_partition",
            Self::BucketOpenInProgress => "bucket_open_in_progress",
            Self::BucketNotAvailable => "bucket_not_available",
            Self::CollectionMapRefreshInProgress => "collection_map_refresh_in_progress",
            Self::GlobalConfigLoadInProgress => "global_config_load_in_progress",
        }
    }
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryReason {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|reason| reason.as_str() == wanted)
            .ok_or_else(|| ErrorKind::invalid_argument(format!("unknown retry reason: {}", s)))
    }
}

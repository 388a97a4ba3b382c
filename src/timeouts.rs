//! Per-service default deadlines
//!
//! [`Timeouts`] is an immutable snapshot built once from configuration.
//! Each service has its own default; any of them can be overridden
//! independently through [`TimeoutOverrides`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ErrorKind;
use crate::request::Service;

pub const DEFAULT_KEY_VALUE_TIMEOUT: Duration = Duration::from_millis(2_500);
pub const DEFAULT_KEY_VALUE_DURABLE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_VIEW_TIMEOUT: Duration = Duration::from_secs(70);
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(75);
pub const DEFAULT_ANALYTICS_TIMEOUT: Duration = Duration::from_secs(80);
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(65);
pub const DEFAULT_MANAGEMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Whole milliseconds in `duration`, saturating at `u64::MAX`
pub fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Optional per-service timeout overrides, in milliseconds
///
/// Deserializes from a JSON object such as
/// `{"query_timeout_ms": 30000, "bucket_management_timeout_ms": 120000}`.
/// Absent fields fall back to the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutOverrides {
    pub key_value_timeout_ms: Option<u64>,
    pub key_value_durable_timeout_ms: Option<u64>,
    pub view_timeout_ms: Option<u64>,
    pub query_timeout_ms: Option<u64>,
    pub analytics_timeout_ms: Option<u64>,
    pub search_timeout_ms: Option<u64>,
    pub management_timeout_ms: Option<u64>,
    pub bucket_management_timeout_ms: Option<u64>,
    pub collection_management_timeout_ms: Option<u64>,
}

impl TimeoutOverrides {
    /// Every override paired with its configuration key, for validation
    pub fn entries(&self) -> [(&'static str, Option<u64>); 9] {
        [
            ("key_value_timeout_ms", self.key_value_timeout_ms),
            ("key_value_durable_timeout_ms", self.key_value_durable_timeout_ms),
            ("view_timeout_ms", self.view_timeout_ms),
            ("query_timeout_ms", self.query_timeout_ms),
            ("analytics_timeout_ms", self.analytics_timeout_ms),
            ("search_timeout_ms", self.search_timeout_ms),
            ("management_timeout_ms", self.management_timeout_ms),
            ("bucket_management_timeout_ms", self.bucket_management_timeout_ms),
            ("collection_management_timeout_ms", self.collection_management_timeout_ms),
        ]
    }

    /// Overlays `other` on top of `self`; fields set in `other` win
    pub fn merge(&self, other: &TimeoutOverrides) -> TimeoutOverrides {
        TimeoutOverrides {
            key_value_timeout_ms: other.key_value_timeout_ms.or(self.key_value_timeout_ms),
            key_value_durable_timeout_ms: other
                .key_value_durable_timeout_ms
                .or(self.key_value_durable_timeout_ms),
            view_timeout_ms: other.view_timeout_ms.or(self.view_timeout_ms),
            query_timeout_ms: other.query_timeout_ms.or(self.query_timeout_ms),
            analytics_timeout_ms: other.analytics_timeout_ms.or(self.analytics_timeout_ms),
            search_timeout_ms: other.search_timeout_ms.or(self.search_timeout_ms),
            management_timeout_ms: other.management_timeout_ms.or(self.management_timeout_ms),
            bucket_management_timeout_ms: other
                .bucket_management_timeout_ms
                .or(self.bucket_management_timeout_ms),
            collection_management_timeout_ms: other
                .collection_management_timeout_ms
                .or(self.collection_management_timeout_ms),
        }
    }
}

/// Resolved per-service deadlines
///
/// # Examples
///
/// ```
/// use dbretry::request::Service;
/// use dbretry::timeouts::{TimeoutOverrides, Timeouts};
/// use std::time::Duration;
///
/// let timeouts = Timeouts::from_configuration(&TimeoutOverrides {
///     management_timeout_ms: Some(90_000),
///     ..Default::default()
/// });
///
/// assert_eq!(timeouts.timeout_for_service(Service::Query), Duration::from_secs(75));
/// assert_eq!(timeouts.timeout_for_service(Service::BucketManagement), Duration::from_secs(90));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub key_value: Duration,
    pub key_value_durable: Duration,
    pub view: Duration,
    pub query: Duration,
    pub analytics: Duration,
    pub search: Duration,
    pub management: Duration,
    pub bucket_management: Duration,
    pub collection_management: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_configuration(&TimeoutOverrides::default())
    }
}

impl Timeouts {
    pub fn from_configuration(overrides: &TimeoutOverrides) -> Self {
        let resolve = |value: Option<u64>, default: Duration| {
            value.map(Duration::from_millis).unwrap_or(default)
        };

        let management = resolve(overrides.management_timeout_ms, DEFAULT_MANAGEMENT_TIMEOUT);

        Self {
            key_value: resolve(overrides.key_value_timeout_ms, DEFAULT_KEY_VALUE_TIMEOUT),
            key_value_durable: resolve(
                overrides.key_value_durable_timeout_ms,
                DEFAULT_KEY_VALUE_DURABLE_TIMEOUT,
            ),
            view: resolve(overrides.view_timeout_ms, DEFAULT_VIEW_TIMEOUT),
            query: resolve(overrides.query_timeout_ms, DEFAULT_QUERY_TIMEOUT),
            analytics: resolve(overrides.analytics_timeout_ms, DEFAULT_ANALYTICS_TIMEOUT),
            search: resolve(overrides.search_timeout_ms, DEFAULT_SEARCH_TIMEOUT),
            management,
            bucket_management: resolve(overrides.bucket_management_timeout_ms, management),
            collection_management: resolve(overrides.collection_management_timeout_ms, management),
        }
    }

    pub fn timeout_for_service(&self, service: Service) -> Duration {
        match service {
            Service::KeyValue => self.key_value,
            Service::View => self.view,
            Service::Query => self.query,
            Service::Analytics => self.analytics,
            Service::Search => self.search,
            Service::Management => self.management,
            Service::BucketManagement => self.bucket_management,
            Service::CollectionManagement => self.collection_management,
        }
    }

    /// Looks up a service by name; unknown names are `InvalidArgument`
    pub fn timeout_for_service_name(&self, name: &str) -> Result<Duration, ErrorKind> {
        let service: Service = name.parse()?;
        Ok(self.timeout_for_service(service))
    }
}

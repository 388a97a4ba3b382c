//! Request envelope tracked across attempts
//!
//! A [`Request`] represents one logical operation for its whole lifetime,
//! however many times it is resent. Identity, payload, idempotency and
//! timeout are fixed at construction. The retry log is append-only and is
//! written by [`RetryOrchestrator::decide`](crate::orchestrator::RetryOrchestrator::decide)
//! alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::reason::RetryReason;
use crate::retry::{best_effort, RetryStrategy};
use crate::timeouts::Timeouts;

/// Target subsystem of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    KeyValue,
    View,
    Query,
    Analytics,
    Search,
    Management,
    BucketManagement,
    CollectionManagement,
}

impl Service {
    pub const ALL: [Service; 8] = [
        Self::KeyValue,
        Self::View,
        Self::Query,
        Self::Analytics,
        Self::Search,
        Self::Management,
        Self::BucketManagement,
        Self::CollectionManagement,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeyValue => "key_value",
            Self::View => "view",
            Self::Query => "query",
            Self::Analytics => "analytics",
            Self::Search => "search",
            Self::Management => "management",
            Self::BucketManagement => "bucket_management",
            Self::CollectionManagement => "collection_management",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "kv" | "key_value" => Ok(Self::KeyValue),
            "view" | "views" => Ok(Self::View),
            "query" => Ok(Self::Query),
            "analytics" => Ok(Self::Analytics),
            "search" => Ok(Self::Search),
            "management" | "mgmt" => Ok(Self::Management),
            "bucket_management" => Ok(Self::BucketManagement),
            "collection_management" => Ok(Self::CollectionManagement),
            _ => Err(ErrorKind::invalid_argument(format!("unknown service: {}", s))),
        }
    }
}

/// One entry of a request's retry log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryAttempt {
    pub reason: RetryReason,
    /// Zero-based index of the retry this entry scheduled
    pub attempt: usize,
}

/// One logical operation across all of its attempts
pub struct Request {
    id: Uuid,
    service: Service,
    operation: String,
    payload: Vec<u8>,
    idempotent: bool,
    timeout: Duration,
    retry_strategy: Arc<dyn RetryStrategy>,
    retry_attempts: Vec<RetryAttempt>,
}

impl Request {
    pub fn builder(service: Service, operation: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(service, operation)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    /// Effective deadline duration resolved at construction
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_strategy(&self) -> &Arc<dyn RetryStrategy> {
        &self.retry_strategy
    }

    pub fn retry_attempts(&self) -> &[RetryAttempt] {
        &self.retry_attempts
    }

    /// Number of retries scheduled so far
    pub fn retry_count(&self) -> usize {
        self.retry_attempts.len()
    }

    pub fn retry_reasons(&self) -> Vec<RetryReason> {
        self.retry_attempts.iter().map(|a| a.reason).collect()
    }

    pub(crate) fn record_retry(&mut self, reason: RetryReason) {
        let attempt = self.retry_attempts.len();
        self.retry_attempts.push(RetryAttempt { reason, attempt });
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("service", &self.service)
            .field("operation", &self.operation)
            .field("payload_len", &self.payload.len())
            .field("idempotent", &self.idempotent)
            .field("timeout", &self.timeout)
            .field("retry_strategy", &self.retry_strategy)
            .field("retry_attempts", &self.retry_attempts)
            .finish()
    }
}

/// Builds a [`Request`], resolving its timeout against a [`Timeouts`] table
///
/// # Examples
///
/// ```
/// use dbretry::request::{Request, Service};
/// use dbretry::timeouts::Timeouts;
/// use std::time::Duration;
///
/// let timeouts = Timeouts::default();
/// let request = Request::builder(Service::KeyValue, "get")
///     .payload(b"user::42".to_vec())
///     .idempotent(true)
///     .build(&timeouts);
///
/// assert_eq!(request.timeout(), Duration::from_millis(2_500));
/// assert_eq!(request.retry_count(), 0);
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    service: Service,
    operation: String,
    payload: Vec<u8>,
    idempotent: bool,
    durable: bool,
    timeout: Option<Duration>,
    retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

impl RequestBuilder {
    pub fn new(service: Service, operation: impl Into<String>) -> Self {
        Self {
            service,
            operation: operation.into(),
            payload: Vec::new(),
            idempotent: false,
            durable: false,
            timeout: None,
            retry_strategy: None,
        }
    }

    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    /// Marks a key-value mutation carrying a durability requirement
    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// Explicit timeout taking precedence over the service default
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_strategy(mut self, strategy: Arc<dyn RetryStrategy>) -> Self {
        self.retry_strategy = Some(strategy);
        self
    }

    pub fn build(self, timeouts: &Timeouts) -> Request {
        let timeout = self.timeout.unwrap_or_else(|| {
            if self.durable && self.service == Service::KeyValue {
                timeouts.key_value_durable
            } else {
                timeouts.timeout_for_service(self.service)
            }
        });

        Request {
            id: Uuid::new_v4(),
            service: self.service,
            operation: self.operation,
            payload: self.payload,
            idempotent: self.idempotent,
            timeout,
            retry_strategy: self.retry_strategy.unwrap_or_else(best_effort),
            retry_attempts: Vec::new(),
        }
    }
}

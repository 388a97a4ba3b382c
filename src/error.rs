//! Error kinds surfaced by the retry layer
//!
//! The taxonomy is intentionally narrow. Operational failures never
//! escape as errors from the orchestrator itself; they are expressed as a
//! [`RequestBehaviour`](crate::orchestrator::RequestBehaviour). The kinds
//! here are what the sender finally hands to the caller.

use thiserror::Error;
use uuid::Uuid;

use crate::reason::RetryReason;
use crate::request::Service;

/// Terminal error kind for a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Retries were disallowed or exhausted by the strategy
    #[error("request canceled")]
    RequestCanceled,

    /// The deadline passed and the operation is known not to have taken effect
    #[error("unambiguous timeout")]
    UnambiguousTimeout,

    /// The deadline passed while a non-idempotent attempt was in flight
    #[error("ambiguous timeout")]
    AmbiguousTimeout,

    /// Programming error, such as an unknown service identifier
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ErrorKind {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// True for both timeout flavours
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::UnambiguousTimeout | Self::AmbiguousTimeout)
    }
}

/// Error delivered to the caller once a request reaches a terminal failure
///
/// Carries the kind plus enough context to tell which request failed and
/// what it went through on the way.
#[derive(Debug, Clone, Error)]
#[error("{kind} (request {request_id}, {service}/{operation}, {retries} retries)", retries = .retry_reasons.len())]
pub struct RequestError {
    pub kind: ErrorKind,
    pub request_id: Uuid,
    pub service: Service,
    pub operation: String,
    /// Reasons recorded for each retry, in order
    pub retry_reasons: Vec<RetryReason>,
}

//! Per-attempt retry decision
//!
//! [`RetryOrchestrator::decide`] runs after every failed attempt. It
//! combines the reason's own overrides with the request's strategy and
//! returns a [`RequestBehaviour`]. It performs no I/O and never sleeps;
//! its only side effect is appending to the request's retry log when the
//! outcome is a retry.

use std::time::Duration;
use tracing::debug;

use crate::error::ErrorKind;
use crate::reason::RetryReason;
use crate::request::Request;
use crate::retry::{controlled_backoff, RetryAction};

/// What the sender must do next with a failed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBehaviour {
    /// Resend the same request once `after` has elapsed
    Retry { after: Duration },
    /// Deliver `error` to the caller
    Fail { error: ErrorKind },
}

impl RequestBehaviour {
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }

    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::Retry { after } => Some(*after),
            Self::Fail { .. } => None,
        }
    }
}

/// Stateless decision function invoked by the sender
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryOrchestrator;

impl RetryOrchestrator {
    /// Decides how a request proceeds after failing with `reason`
    ///
    /// Always-retry reasons skip the request's strategy and use the
    /// controlled backoff schedule. Anything else is delegated to the
    /// strategy; a refusal becomes `Fail(RequestCanceled)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbretry::orchestrator::{RequestBehaviour, RetryOrchestrator};
    /// use dbretry::reason::RetryReason;
    /// use dbretry::request::{Request, Service};
    /// use dbretry::timeouts::Timeouts;
    /// use std::time::Duration;
    ///
    /// let mut request = Request::builder(Service::KeyValue, "get")
    ///     .idempotent(true)
    ///     .build(&Timeouts::default());
    ///
    /// let behaviour = RetryOrchestrator::decide(&mut request, RetryReason::KvLocked);
    /// assert_eq!(behaviour, RequestBehaviour::Retry { after: Duration::from_millis(1) });
    /// assert_eq!(request.retry_count(), 1);
    /// ```
    pub fn decide(request: &mut Request, reason: RetryReason) -> RequestBehaviour {
        if reason.always_retry() {
            let after = controlled_backoff(request.retry_count());
            debug!(
                request_id = %request.id(),
                operation = request.operation(),
                %reason,
                attempt = request.retry_count(),
                "Controlled retry after {:?}",
                after
            );
            request.record_retry(reason);
            return RequestBehaviour::Retry { after };
        }

        let action = request.retry_strategy().retry_after(request, reason);
        match action {
            RetryAction::Retry(after) => {
                debug!(
                    request_id = %request.id(),
                    operation = request.operation(),
                    %reason,
                    attempt = request.retry_count(),
                    "Strategy retry after {:?}",
                    after
                );
                request.record_retry(reason);
                RequestBehaviour::Retry { after }
            }
            RetryAction::NoRetry => {
                debug!(
                    request_id = %request.id(),
                    operation = request.operation(),
                    %reason,
                    idempotent = request.is_idempotent(),
                    "Strategy declined retry, canceling request"
                );
                RequestBehaviour::Fail { error: ErrorKind::RequestCanceled }
            }
        }
    }
}

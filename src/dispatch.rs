//! Deadline-aware sender loop
//!
//! The orchestrator decides; this module waits. [`send_with_retries`]
//! runs attempts until one succeeds, the orchestrator fails the request,
//! or the request's deadline would be crossed. Features:
//!
//! - One absolute deadline per request, computed from its resolved timeout
//! - Each attempt bounded by the time remaining
//! - Retry delays that would overrun the deadline fail early instead of sleeping
//! - Ambiguous and unambiguous timeouts told apart by idempotency
//!
//! Timing uses `tokio::time`, so paused-clock tests drive it deterministically.

use std::future::Future;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, RequestError};
use crate::orchestrator::{RequestBehaviour, RetryOrchestrator};
use crate::reason::RetryReason;
use crate::request::Request;

/// Sends a request, retrying failed attempts as the orchestrator directs
///
/// `attempt` is called once per try with the current request state. It
/// resolves to the response, or to the [`RetryReason`] the transport
/// classified the failure as.
///
/// # Returns
/// * `Ok(T)` - The first successful response
/// * `Err(RequestError)` - `RequestCanceled` when the strategy refuses a
///   retry, or a timeout kind once the deadline is exhausted
///
/// # Examples
///
/// ```
/// use dbretry::dispatch::send_with_retries;
/// use dbretry::reason::RetryReason;
/// use dbretry::request::{Request, Service};
/// use dbretry::timeouts::Timeouts;
///
/// # async fn example() -> Result<(), dbretry::error::RequestError> {
/// let mut request = Request::builder(Service::KeyValue, "get")
///     .idempotent(true)
///     .build(&Timeouts::default());
///
/// let mut failures = 2;
/// let value = send_with_retries(&mut request, |_req| {
///     let outcome = if failures > 0 {
///         failures -= 1;
///         Err(RetryReason::KvLocked)
///     } else {
///         Ok("value")
///     };
///     async move { outcome }
/// })
/// .await?;
///
/// assert_eq!(value, "value");
/// assert_eq!(request.retry_count(), 2);
/// # Ok(())
/// # }
/// ```
pub async fn send_with_retries<F, Fut, T>(
    request: &mut Request,
    mut attempt: F,
) -> Result<T, RequestError>
where
    F: FnMut(&Request) -> Fut,
    Fut: Future<Output = Result<T, RetryReason>>,
{
    // A timeout too large to represent leaves the request without a deadline
    let deadline = Instant::now().checked_add(request.timeout());

    loop {
        let response = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(fail(request, ErrorKind::UnambiguousTimeout));
                }

                match timeout(remaining, attempt(&*request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        // The attempt may have reached the server; only idempotent
                        // operations can claim it had no effect.
                        let kind = if request.is_idempotent() {
                            ErrorKind::UnambiguousTimeout
                        } else {
                            ErrorKind::AmbiguousTimeout
                        };
                        return Err(fail(request, kind));
                    }
                }
            }
            None => attempt(&*request).await,
        };

        let reason = match response {
            Ok(response) => {
                if request.retry_count() > 0 {
                    info!(
                        request_id = %request.id(),
                        "{} succeeded after {} retries",
                        request.operation(),
                        request.retry_count()
                    );
                }
                return Ok(response);
            }
            Err(reason) => reason,
        };

        match RetryOrchestrator::decide(request, reason) {
            RequestBehaviour::Retry { after } => {
                let fits = match (Instant::now().checked_add(after), deadline) {
                    (Some(resume), Some(deadline)) => resume < deadline,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if !fits {
                    debug!(
                        request_id = %request.id(),
                        "Retry delay {:?} exceeds remaining budget",
                        after
                    );
                    return Err(fail(request, ErrorKind::UnambiguousTimeout));
                }

                debug!(
                    request_id = %request.id(),
                    "Retry attempt {} for {} after {:?} ({})",
                    request.retry_count(),
                    request.operation(),
                    after,
                    reason
                );
                sleep(after).await;
            }
            RequestBehaviour::Fail { error } => return Err(fail(request, error)),
        }
    }
}

fn fail(request: &Request, kind: ErrorKind) -> RequestError {
    warn!(
        request_id = %request.id(),
        service = %request.service(),
        "{} failed: {} after {} retries",
        request.operation(),
        kind,
        request.retry_count()
    );

    RequestError {
        kind,
        request_id: request.id(),
        service: request.service(),
        operation: request.operation().to_string(),
        retry_reasons: request.retry_reasons(),
    }
}

use dbretry::error::ErrorKind;
use dbretry::orchestrator::{RequestBehaviour, RetryOrchestrator};
use dbretry::reason::RetryReason;
use dbretry::request::{Request, Service};
use dbretry::retry::{FailFastRetryStrategy, RetryAction, RetryStrategy};
use dbretry::timeouts::Timeouts;
use std::sync::Arc;
use std::time::Duration;

fn kv_request(operation: &str, idempotent: bool) -> Request {
    Request::builder(Service::KeyValue, operation)
        .idempotent(idempotent)
        .build(&Timeouts::default())
}

fn retry(ms: u64) -> RequestBehaviour {
    RequestBehaviour::Retry { after: Duration::from_millis(ms) }
}

fn canceled() -> RequestBehaviour {
    RequestBehaviour::Fail { error: ErrorKind::RequestCanceled }
}

/// Allows three retries, then gives up
#[derive(Debug)]
struct LimitedRetryStrategy;

impl RetryStrategy for LimitedRetryStrategy {
    fn retry_after(&self, request: &Request, _reason: RetryReason) -> RetryAction {
        if request.retry_count() < 3 {
            RetryAction::Retry(Duration::from_millis(7))
        } else {
            RetryAction::NoRetry
        }
    }
}

#[test]
fn test_idempotent_requests_always_retry_first_failure() {
    for reason in RetryReason::ALL {
        let mut request = kv_request("get", true);
        let behaviour = RetryOrchestrator::decide(&mut request, reason);
        assert!(behaviour.is_retry(), "{} should be retried for an idempotent get", reason);
        assert_eq!(request.retry_count(), 1);
    }
}

#[test]
fn test_non_idempotent_gated_on_reason() {
    let gated: Vec<RetryReason> = RetryReason::ALL
        .into_iter()
        .filter(|r| !r.allows_non_idempotent_retry() && !r.always_retry())
        .collect();
    assert!(gated.contains(&RetryReason::Unknown));
    assert!(gated.contains(&RetryReason::SocketClosedWhileInFlight));

    for reason in gated {
        let mut request = kv_request("increment", false);
        assert_eq!(RetryOrchestrator::decide(&mut request, reason), canceled());
        assert_eq!(request.retry_count(), 0, "fail must not append to the retry log");
    }
}

#[test]
fn test_always_retry_overrides_idempotency_and_strategy() {
    for reason in RetryReason::ALL.into_iter().filter(|r| r.always_retry()) {
        let mut request = Request::builder(Service::KeyValue, "append")
            .idempotent(false)
            .retry_strategy(Arc::new(FailFastRetryStrategy))
            .build(&Timeouts::default());

        assert_eq!(RetryOrchestrator::decide(&mut request, reason), retry(1));
        assert_eq!(request.retry_attempts()[0].reason, reason);
    }
}

#[test]
fn test_retry_log_grows_by_one_per_retry() {
    let mut request = kv_request("get", true);

    for n in 1..=10 {
        let behaviour = RetryOrchestrator::decide(&mut request, RetryReason::KvTemporaryFailure);
        assert!(behaviour.is_retry());
        assert_eq!(request.retry_count(), n);
    }

    let indices: Vec<usize> = request.retry_attempts().iter().map(|a| a.attempt).collect();
    assert_eq!(indices, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_fail_after_retries_leaves_log_untouched() {
    let mut request = Request::builder(Service::Query, "select")
        .idempotent(true)
        .retry_strategy(Arc::new(LimitedRetryStrategy))
        .build(&Timeouts::default());

    for _ in 0..3 {
        assert_eq!(
            RetryOrchestrator::decide(&mut request, RetryReason::QueryPreparedStatementFailure),
            retry(7)
        );
    }

    assert_eq!(
        RetryOrchestrator::decide(&mut request, RetryReason::QueryPreparedStatementFailure),
        canceled()
    );
    assert_eq!(request.retry_count(), 3);
}

#[test]
fn test_best_effort_delay_capped_at_fifty() {
    let mut request = kv_request("get", true);

    let delays: Vec<Duration> = (0..10)
        .filter_map(|_| RetryOrchestrator::decide(&mut request, RetryReason::KvLocked).delay())
        .collect();

    let expected: Vec<Duration> = [1, 2, 4, 8, 16, 32, 50, 50, 50, 50]
        .into_iter()
        .map(Duration::from_millis)
        .collect();
    assert_eq!(delays, expected);
}

#[test]
fn test_controlled_backoff_schedule_for_always_retry_reason() {
    let mut request = kv_request("replace", false);

    let delays: Vec<u64> = (0..7)
        .filter_map(|_| RetryOrchestrator::decide(&mut request, RetryReason::KvNotMyVbucket).delay())
        .map(|d| d.as_millis() as u64)
        .collect();

    assert_eq!(delays, vec![1, 10, 50, 100, 500, 1000, 1000]);
    assert_eq!(request.retry_count(), 7);
}

#[test]
fn test_idempotent_get_under_lock() {
    let mut request = kv_request("get", true);
    assert_eq!(RetryOrchestrator::decide(&mut request, RetryReason::KvLocked), retry(1));
}

#[test]
fn test_non_idempotent_replace_under_unknown_failure() {
    let mut request = kv_request("replace", false);
    assert_eq!(RetryOrchestrator::decide(&mut request, RetryReason::Unknown), canceled());
}

#[test]
fn test_non_idempotent_replace_under_routing_race() {
    let mut request = kv_request("replace", false);

    // Two earlier retries put the controlled schedule at its third step
    for _ in 0..2 {
        RetryOrchestrator::decide(&mut request, RetryReason::KvLocked);
    }
    assert_eq!(
        RetryOrchestrator::decide(&mut request, RetryReason::KvCollectionOutdated),
        retry(50)
    );

    let mut fresh = kv_request("replace", false);
    assert_eq!(
        RetryOrchestrator::decide(&mut fresh, RetryReason::KvCollectionOutdated),
        retry(1)
    );
}

#[test]
fn test_mixed_reasons_share_one_attempt_counter() {
    let mut request = kv_request("upsert", true);

    assert_eq!(RetryOrchestrator::decide(&mut request, RetryReason::KvLocked), retry(1));
    assert_eq!(RetryOrchestrator::decide(&mut request, RetryReason::KvNotMyVbucket), retry(10));
    assert_eq!(RetryOrchestrator::decide(&mut request, RetryReason::NodeNotAvailable), retry(4));

    assert_eq!(
        request.retry_reasons(),
        vec![
            RetryReason::KvLocked,
            RetryReason::KvNotMyVbucket,
            RetryReason::NodeNotAvailable
        ]
    );
}

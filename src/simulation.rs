//! Offline exercising of the retry layer
//!
//! This module drives the orchestrator and the sender without a real
//! cluster, which is how the `dbretry` binary lets operators inspect a
//! configuration:
//! - Planning: the sequence of decisions a reason produces, attempt by attempt
//! - Simulation: many concurrent requests sent through a scripted transport
//!   that fails a fixed number of times before answering
//!
//! Results are serializable so the binary can print them as JSON lines.

use futures::{stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::dispatch::send_with_retries;
use crate::orchestrator::{RequestBehaviour, RetryOrchestrator};
use crate::reason::RetryReason;
use crate::request::{Request, Service};
use crate::retry::RetryStrategy;
use crate::timeouts::{duration_to_millis, Timeouts};

/// Outcome of a planned decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanBehaviour {
    Retry,
    Fail,
}

/// One orchestrator decision in a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    /// Retries already recorded when the decision was made
    pub attempt: usize,
    pub reason: RetryReason,
    pub behaviour: PlanBehaviour,
    pub delay_ms: Option<u64>,
    pub error: Option<String>,
}

/// Outcome of one simulated request
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub request_id: Uuid,
    pub service: Service,
    pub operation: String,
    pub idempotent: bool,
    pub timeout_ms: u64,
    pub retries: usize,
    pub retry_reasons: Vec<RetryReason>,
    pub elapsed_ms: u64,
    /// Error message if the request failed
    pub error: Option<String>,
}

/// Parameters for [`Simulator::simulate`]
#[derive(Debug, Clone)]
pub struct SimulationSpec {
    pub service: Service,
    pub operation: String,
    pub reason: RetryReason,
    /// Failed attempts before the transport answers
    pub failures: usize,
    pub requests: usize,
    pub idempotent: bool,
    /// Time each scripted attempt takes
    pub latency: Duration,
    /// Explicit per-request timeout, bypassing the service default
    pub timeout: Option<Duration>,
}

/// Runs plans and simulations against one client configuration
#[derive(Debug, Clone)]
pub struct Simulator {
    timeouts: Timeouts,
    strategy: Arc<dyn RetryStrategy>,
    concurrent_limit: usize,
}

impl Simulator {
    pub fn new(config: &ClientConfig, concurrent_limit: usize) -> Self {
        Self {
            timeouts: config.timeouts(),
            strategy: config.retry_strategy(),
            concurrent_limit: concurrent_limit.max(1),
        }
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Asks the orchestrator up to `attempts` times about the same failure
    ///
    /// Stops early at the first `Fail`, since a failed request is never
    /// resent.
    pub fn plan(
        &self,
        service: Service,
        reason: RetryReason,
        idempotent: bool,
        attempts: usize,
    ) -> Vec<PlanStep> {
        let mut request = Request::builder(service, "plan")
            .idempotent(idempotent)
            .retry_strategy(Arc::clone(&self.strategy))
            .build(&self.timeouts);

        let mut steps = Vec::with_capacity(attempts);
        for _ in 0..attempts {
            let attempt = request.retry_count();
            let step = match RetryOrchestrator::decide(&mut request, reason) {
                RequestBehaviour::Retry { after } => PlanStep {
                    attempt,
                    reason,
                    behaviour: PlanBehaviour::Retry,
                    delay_ms: Some(duration_to_millis(after)),
                    error: None,
                },
                RequestBehaviour::Fail { error } => PlanStep {
                    attempt,
                    reason,
                    behaviour: PlanBehaviour::Fail,
                    delay_ms: None,
                    error: Some(error.to_string()),
                },
            };
            let failed = step.behaviour == PlanBehaviour::Fail;
            steps.push(step);
            if failed {
                break;
            }
        }
        steps
    }

    /// Sends `spec.requests` requests concurrently through the scripted transport
    pub async fn simulate(&self, spec: &SimulationSpec) -> Vec<SimulationResult> {
        info!(
            "Simulating {} {} requests failing {} times with {}",
            spec.requests, spec.service, spec.failures, spec.reason
        );

        stream::iter(0..spec.requests)
            .map(|index| {
                let simulator = self.clone();
                let spec = spec.clone();
                async move {
                    debug!("Starting simulated request {}", index);
                    simulator.simulate_one(&spec).await
                }
            })
            .buffer_unordered(self.concurrent_limit)
            .collect()
            .await
    }

    async fn simulate_one(&self, spec: &SimulationSpec) -> SimulationResult {
        let start = Instant::now();

        let mut builder = Request::builder(spec.service, spec.operation.clone())
            .idempotent(spec.idempotent)
            .retry_strategy(Arc::clone(&self.strategy));
        if let Some(timeout) = spec.timeout {
            builder = builder.timeout(timeout);
        }
        let mut request = builder.build(&self.timeouts);

        let mut remaining_failures = spec.failures;
        let reason = spec.reason;
        let latency = spec.latency;
        let outcome = send_with_retries(&mut request, |_req| {
            let result = if remaining_failures > 0 {
                remaining_failures -= 1;
                Err(reason)
            } else {
                Ok(())
            };
            async move {
                sleep(latency).await;
                result
            }
        })
        .await;

        SimulationResult {
            request_id: request.id(),
            service: request.service(),
            operation: request.operation().to_string(),
            idempotent: request.is_idempotent(),
            timeout_ms: duration_to_millis(request.timeout()),
            retries: request.retry_count(),
            retry_reasons: request.retry_reasons(),
            elapsed_ms: duration_to_millis(start.elapsed()),
            error: outcome.err().map(|e| e.kind.to_string()),
        }
    }
}

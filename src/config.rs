//! Client configuration
//!
//! Configuration is read from an optional JSON file and then overlaid
//! with command-line flags. Example file:
//!
//! ```json
//! {
//!   "timeouts": { "key_value_timeout_ms": 5000, "query_timeout_ms": 30000 },
//!   "retry": { "strategy": "best_effort", "backoff_cap_ms": 100 }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::ErrorKind;
use crate::retry::{BestEffortRetryStrategy, FailFastRetryStrategy, RetryStrategy, DEFAULT_BACKOFF_CAP};
use crate::timeouts::{duration_to_millis, TimeoutOverrides, Timeouts};
use crate::validation::{validate_backoff_cap, validate_timeouts};

/// Which built-in strategy governs requests without an explicit override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    BestEffort,
    FailFast,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BestEffort => f.write_str("best_effort"),
            Self::FailFast => f.write_str("fail_fast"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(Self::BestEffort),
            "fail_fast" => Ok(Self::FailFast),
            _ => Err(ErrorKind::invalid_argument(format!("unknown retry strategy: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub strategy: StrategyKind,
    /// Ceiling for the best-effort exponential backoff
    pub backoff_cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            backoff_cap_ms: duration_to_millis(DEFAULT_BACKOFF_CAP),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub timeouts: TimeoutOverrides,
    pub retry: RetryConfig,
}

impl ClientConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ClientConfig =
            serde_json::from_str(json).context("Failed to parse client configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file
    pub async fn load(path: &Path) -> Result<Self> {
        debug!("Loading client configuration from {}", path.display());
        let contents = tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read configuration file: {:?}", path))?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ErrorKind> {
        validate_timeouts(&self.timeouts)?;
        validate_backoff_cap(self.retry.backoff_cap_ms)
    }

    /// Applies command-line overrides on top of this configuration
    pub fn with_overrides(
        mut self,
        timeouts: &TimeoutOverrides,
        strategy: Option<StrategyKind>,
        backoff_cap_ms: Option<u64>,
    ) -> Result<Self, ErrorKind> {
        self.timeouts = self.timeouts.merge(timeouts);
        if let Some(strategy) = strategy {
            self.retry.strategy = strategy;
        }
        if let Some(cap) = backoff_cap_ms {
            self.retry.backoff_cap_ms = cap;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts::from_configuration(&self.timeouts)
    }

    pub fn retry_strategy(&self) -> Arc<dyn RetryStrategy> {
        match self.retry.strategy {
            StrategyKind::BestEffort => Arc::new(BestEffortRetryStrategy::with_cap(
                Duration::from_millis(self.retry.backoff_cap_ms),
            )),
            StrategyKind::FailFast => Arc::new(FailFastRetryStrategy),
        }
    }
}

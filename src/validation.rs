use tracing::warn;

use crate::error::ErrorKind;
use crate::timeouts::TimeoutOverrides;

/// Longest timeout accepted without a warning (one hour)
const UNUSUAL_TIMEOUT_MS: u64 = 3_600_000;

/// Provides validation of retry and timeout configuration values
pub struct ConfigValidator;

impl ConfigValidator {
    /// Creates a new ConfigValidator instance
    pub fn new() -> Self {
        Self {}
    }

    /// Validates a single timeout value in milliseconds
    ///
    /// A timeout must be strictly positive and must fit in a `Duration`
    /// added to the current instant, which rules out values near `u64::MAX`.
    pub fn validate_timeout_ms(&self, value_ms: u64) -> bool {
        value_ms > 0 && value_ms <= i64::MAX as u64
    }

    /// Checks if a timeout looks like a unit mistake
    ///
    /// Values over an hour usually mean seconds were multiplied twice or
    /// microseconds were passed where milliseconds were expected.
    pub fn is_unusual(&self, value_ms: u64) -> bool {
        value_ms > UNUSUAL_TIMEOUT_MS
    }

    /// Validates a best-effort backoff ceiling in milliseconds
    pub fn validate_backoff_cap_ms(&self, value_ms: u64) -> bool {
        value_ms > 0
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates every override that is present
///
/// Returns `InvalidArgument` naming the first offending key. Unusually long
/// values are accepted but logged.
pub fn validate_timeouts(overrides: &TimeoutOverrides) -> Result<(), ErrorKind> {
    let validator = ConfigValidator::new();

    for (key, value) in overrides.entries() {
        let Some(value_ms) = value else {
            continue;
        };

        if !validator.validate_timeout_ms(value_ms) {
            return Err(ErrorKind::invalid_argument(format!(
                "{} must be a positive number of milliseconds, got {}",
                key, value_ms
            )));
        }

        if validator.is_unusual(value_ms) {
            warn!("{} is unusually long: {}ms", key, value_ms);
        }
    }

    Ok(())
}

/// Validates the backoff cap used by the best-effort strategy
pub fn validate_backoff_cap(cap_ms: u64) -> Result<(), ErrorKind> {
    if ConfigValidator::new().validate_backoff_cap_ms(cap_ms) {
        Ok(())
    } else {
        Err(ErrorKind::invalid_argument(format!(
            "backoff_cap_ms must be positive, got {}",
            cap_ms
        )))
    }
}

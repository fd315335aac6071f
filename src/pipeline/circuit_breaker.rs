//! Drop guard applied before a snapshot is replaced.
//!
//! A listing that suddenly shrinks is far more often broken upstream markup
//! than a cinema cancelling most of its programme. When the entry count drops
//! by more than `max_drop_percent` against a stored snapshot of at least
//! `min_baseline` entries, the source run is aborted before any notification
//! goes out and the stored snapshot stays authoritative.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Whether the guard runs at all
    pub enabled: bool,
    /// Maximum allowed drop percentage (0-100). Default: 50%
    pub max_drop_percent: u8,
    /// Below this many stored entries the check is skipped.
    pub min_baseline: usize,
    /// Allow empty results when the stored snapshot was also empty
    pub allow_cold_start: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_drop_percent: 50,
            min_baseline: 10,
            allow_cold_start: true,
        }
    }
}

/// Circuit breaker for preventing bad snapshot updates.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
}

/// Result of circuit breaker check.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitBreakerResult {
    /// Safe to proceed
    Safe {
        current_count: usize,
        previous_count: usize,
    },
    /// No stored snapshot, or one below the baseline
    ColdStart { current_count: usize },
    /// Drop exceeds the threshold
    Triggered {
        current_count: usize,
        previous_count: usize,
        drop_percent: f64,
    },
    /// Nothing scraped although entries were stored
    EmptyResult,
    /// Guard disabled in configuration
    Disabled,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new circuit breaker with custom configuration.
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self { config }
    }

    /// Compare the scraped entry count with the stored one (`None` = no snapshot).
    pub fn check(
        &self,
        current_count: usize,
        previous_count: Option<usize>,
    ) -> CircuitBreakerResult {
        if !self.config.enabled {
            return CircuitBreakerResult::Disabled;
        }
        let previous_count = previous_count.unwrap_or(0);

        if current_count == 0 {
            if previous_count == 0 && self.config.allow_cold_start {
                return CircuitBreakerResult::ColdStart { current_count };
            }
            return CircuitBreakerResult::EmptyResult;
        }

        if previous_count < self.config.min_baseline {
            return CircuitBreakerResult::ColdStart { current_count };
        }

        if current_count < previous_count {
            let drop = previous_count - current_count;
            let drop_percent = (drop as f64 / previous_count as f64) * 100.0;

            if drop_percent > self.config.max_drop_percent as f64 {
                return CircuitBreakerResult::Triggered {
                    current_count,
                    previous_count,
                    drop_percent,
                };
            }
        }

        CircuitBreakerResult::Safe {
            current_count,
            previous_count,
        }
    }

    /// Return Ok if the new entry set may replace the stored one.
    pub fn validate(
        &self,
        source_id: &str,
        current_count: usize,
        previous_count: Option<usize>,
    ) -> Result<()> {
        match self.check(current_count, previous_count) {
            CircuitBreakerResult::Safe {
                current_count,
                previous_count,
            } => {
                log::debug!(
                    "{source_id}: circuit breaker SAFE ({current_count} entries, was {previous_count})"
                );
                Ok(())
            }
            CircuitBreakerResult::ColdStart { current_count } => {
                log::debug!(
                    "{source_id}: circuit breaker COLD START ({current_count} entries, below baseline)"
                );
                Ok(())
            }
            CircuitBreakerResult::Disabled => Ok(()),
            CircuitBreakerResult::Triggered {
                current_count,
                previous_count,
                drop_percent,
            } => {
                log::error!(
                    "{source_id}: circuit breaker TRIGGERED {previous_count} -> {current_count} entries ({drop_percent:.1}% drop > {}% threshold)",
                    self.config.max_drop_percent
                );
                Err(AppError::CircuitBreakerTriggered {
                    current_count,
                    previous_count,
                    drop_percent,
                    threshold_percent: self.config.max_drop_percent,
                })
            }
            CircuitBreakerResult::EmptyResult => {
                log::error!("{source_id}: circuit breaker EMPTY RESULT");
                Err(AppError::EmptyScrape)
            }
        }
    }
}

//! Circuit breaker for the live polling loop.
//!
//! Counts consecutive fetch failures and trips once the count reaches the
//! configured threshold. A tripped monitor stays tripped until [`HealthMonitor::rearm`]
//! is called by the cooldown timer; a stray success does not close it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;


/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Consecutive failures that trip the breaker
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Time the loop stays suspended after a trip (seconds)
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_cooldown_secs() -> u64 {
    300
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl HealthConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Returned by [`HealthMonitor::record_failure`] when the breaker trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSignal {
    /// Consecutive failures that caused the trip
    pub failure_count: u32,

    pub tripped_at: DateTime<Utc>,

    /// Description of the failure that tripped the breaker
    pub last_error: String,
}

/// Snapshot of the monitor's counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthStats {
    pub consecutive_failures: u32,
    pub tripped: bool,
    pub total_successes: u64,
    pub total_failures: u64,
    pub total_trips: u64,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
}

/// Tracks consecutive fetch failures and trips a circuit breaker.
#[derive(Debug)]
pub struct HealthMonitor {
    config: HealthConfig,
    consecutive_failures: u32,
    tripped_at: Option<Instant>,
    total_successes: u64,
    total_failures: u64,
    total_trips: u64,
    last_error: Option<String>,
    last_success: Option<DateTime<Utc>>,
}

impl HealthMonitor {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
            tripped_at: None,
            total_successes: 0,
            total_failures: 0,
            total_trips: 0,
            last_error: None,
            last_success: None,
        }
    }

    /// Resets the failure counter.
    ///
    /// Ignored while tripped: only [`HealthMonitor::rearm`] leaves the tripped state.
    pub fn record_success(&mut self) {
        if self.is_tripped() {
            return;
        }
        self.consecutive_failures = 0;
        self.total_successes += 1;
        self.last_error = None;
        self.last_success = Some(Utc::now());
    }

    /// Counts a failure. Returns a [`TripSignal`] on the failure that reaches
    /// the threshold; later failures while tripped return `None`.
    pub fn record_failure(&mut self, error: &str) -> Option<TripSignal> {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_failures += 1;
        self.last_error = Some(error.to_string());

        if self.is_tripped() || self.consecutive_failures < self.config.failure_threshold.max(1) {
            return None;
        }

        self.tripped_at = Some(Instant::now());
        self.total_trips += 1;

        Some(TripSignal {
            failure_count: self.consecutive_failures,
            tripped_at: Utc::now(),
            last_error: error.to_string(),
        })
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped_at.is_some()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Time left before the cooldown elapses, `None` when not tripped.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        self.tripped_at
            .map(|at| self.config.cooldown().saturating_sub(at.elapsed()))
    }

    /// Leaves the tripped state and zeroes the failure counter (cooldown elapsed).
    pub fn rearm(&mut self) {
        self.tripped_at = None;
        self.consecutive_failures = 0;
    }

    /// Clears counters and history (engine teardown).
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    pub fn stats(&self) -> HealthStats {
        HealthStats {
            consecutive_failures: self.consecutive_failures,
            tripped: self.is_tripped(),
            total_successes: self.total_successes,
            total_failures: self.total_failures,
            total_trips: self.total_trips,
            last_error: self.last_error.clone(),
            last_success: self.last_success,
        }
    }
}

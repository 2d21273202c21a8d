//! Polling interval selection.
//!
//! [`IntervalPolicy::next_interval`] is a pure function of the loop's current
//! conditions. The delay before any background doubling never exceeds
//! `max_interval_ms`, so the overall ceiling is `2 * max_interval_ms`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters for adaptive poll delays (all durations in milliseconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalPolicy {
    /// Delay when no match is live
    #[serde(default = "default_idle_interval")]
    pub idle_interval_ms: u64,

    /// Delay with a handful of live matches
    #[serde(default = "default_live_interval")]
    pub live_interval_ms: u64,

    /// Delay when more than `busy_live_threshold` matches are live
    #[serde(default = "default_busy_interval")]
    pub busy_interval_ms: u64,

    #[serde(default = "default_busy_live_threshold")]
    pub busy_live_threshold: usize,

    /// Responses slower than this add `slow_response_penalty_ms`
    #[serde(default = "default_slow_response")]
    pub slow_response_ms: u64,

    #[serde(default = "default_slow_response_penalty")]
    pub slow_response_penalty_ms: u64,

    /// Added per consecutive failure
    #[serde(default = "default_failure_step")]
    pub failure_step_ms: u64,

    /// Ceiling before the background multiplier
    #[serde(default = "default_max_interval")]
    pub max_interval_ms: u64,
}

fn default_idle_interval() -> u64 {
    60_000
}

fn default_live_interval() -> u64 {
    30_000
}

fn default_busy_interval() -> u64 {
    20_000
}

fn default_busy_live_threshold() -> usize {
    3
}

fn default_slow_response() -> u64 {
    3_000
}

fn default_slow_response_penalty() -> u64 {
    10_000
}

fn default_failure_step() -> u64 {
    5_000
}

fn default_max_interval() -> u64 {
    300_000
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            idle_interval_ms: default_idle_interval(),
            live_interval_ms: default_live_interval(),
            busy_interval_ms: default_busy_interval(),
            busy_live_threshold: default_busy_live_threshold(),
            slow_response_ms: default_slow_response(),
            slow_response_penalty_ms: default_slow_response_penalty(),
            failure_step_ms: default_failure_step(),
            max_interval_ms: default_max_interval(),
        }
    }
}

impl IntervalPolicy {
    /// Computes the delay before the next poll.
    ///
    /// Non-decreasing in `last_latency_ms`, `consecutive_failures` and
    /// `backgrounded`; non-increasing in `live_count` as long as the base
    /// intervals are ordered `idle >= live >= busy`.
    pub fn next_interval(
        &self,
        live_count: usize,
        last_latency_ms: u64,
        consecutive_failures: u32,
        backgrounded: bool,
    ) -> Duration {
        let base = match live_count {
            0 => self.idle_interval_ms,
            n if n > self.busy_live_threshold => self.busy_interval_ms,
            _ => self.live_interval_ms,
        };

        let latency_penalty = if last_latency_ms > self.slow_response_ms {
            self.slow_response_penalty_ms
        } else {
            0
        };

        let failure_penalty = self
            .failure_step_ms
            .saturating_mul(u64::from(consecutive_failures));

        let delay = base
            .saturating_add(latency_penalty)
            .saturating_add(failure_penalty)
            .min(self.max_interval_ms);

        let delay = if backgrounded {
            delay.saturating_mul(2)
        } else {
            delay
        };

        Duration::from_millis(delay)
    }

    /// Largest delay [`IntervalPolicy::next_interval`] can return.
    pub fn ceiling(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms.saturating_mul(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_interval_by_live_count() {
        let policy = IntervalPolicy::default();
        assert_eq!(policy.next_interval(0, 100, 0, false), Duration::from_secs(60));
        assert_eq!(policy.next_interval(1, 100, 0, false), Duration::from_secs(30));
        assert_eq!(policy.next_interval(3, 100, 0, false), Duration::from_secs(30));
        assert_eq!(policy.next_interval(4, 100, 0, false), Duration::from_secs(20));
    }

    #[test]
    fn test_slow_response_penalty() {
        let policy = IntervalPolicy::default();
        assert_eq!(policy.next_interval(1, 3_000, 0, false), Duration::from_secs(30));
        assert_eq!(policy.next_interval(1, 3_001, 0, false), Duration::from_secs(40));
    }

    #[test]
    fn test_background_doubles_delay() {
        let policy = IntervalPolicy::default();
        assert_eq!(policy.next_interval(1, 0, 0, true), Duration::from_secs(60));
        assert_eq!(policy.next_interval(0, 0, 0, true), Duration::from_secs(120));
    }

    #[test]
    fn test_failures_grow_delay_up_to_ceiling() {
        let policy = IntervalPolicy::default();
        assert_eq!(policy.next_interval(1, 0, 1, false), Duration::from_secs(35));
        assert_eq!(policy.next_interval(1, 0, 4, false), Duration::from_secs(50));
        assert_eq!(policy.next_interval(1, 0, 1_000, false), Duration::from_secs(300));
        assert_eq!(policy.next_interval(1, 0, u32::MAX, true), policy.ceiling());
    }

    #[test]
    fn test_monotonic_in_failures() {
        let policy = IntervalPolicy::default();
        for live in [0usize, 2, 10] {
            for latency in [0u64, 5_000] {
                for backgrounded in [false, true] {
                    let mut previous = Duration::ZERO;
                    for failures in 0..200 {
                        let delay = policy.next_interval(live, latency, failures, backgrounded);
                        assert!(delay >= previous);
                        assert!(delay <= policy.ceiling());
                        previous = delay;
                    }
                }
            }
        }
    }

    #[test]
    fn test_monotonic_in_live_count() {
        let policy = IntervalPolicy::default();
        let idle = policy.next_interval(0, 0, 0, false);
        let mut previous = idle;
        for live in 1..20 {
            let delay = policy.next_interval(live, 0, 0, false);
            assert!(delay <= previous);
            assert!(delay <= idle);
            previous = delay;
        }
    }
}

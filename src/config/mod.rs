use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// Re-export component config types
pub use crate::health::HealthConfig;
pub use crate::interval::IntervalPolicy;
pub use crate::snapshot::config::SnapshotConfig;

/// Complete engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub polling: IntervalPolicy,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

/// Remote fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// A fetch still pending after this long counts as failed
    #[serde(default = "default_fetch_timeout")]
    pub timeout_ms: u64,
}

fn default_fetch_timeout() -> u64 {
    10_000
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_fetch_timeout(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl EngineConfig {
    /// Defaults overridden by `LIVEPOLL_*` environment variables.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    /// Overlays `LIVEPOLL_*` environment variables onto this config.
    pub fn apply_env(&mut self) {
        override_from_env("LIVEPOLL_FAILURE_THRESHOLD", &mut self.health.failure_threshold);
        override_from_env("LIVEPOLL_COOLDOWN_SECS", &mut self.health.cooldown_secs);
        override_from_env("LIVEPOLL_FETCH_TIMEOUT_MS", &mut self.fetch.timeout_ms);
        override_from_env("LIVEPOLL_IDLE_INTERVAL_MS", &mut self.polling.idle_interval_ms);
        override_from_env("LIVEPOLL_LIVE_INTERVAL_MS", &mut self.polling.live_interval_ms);
        override_from_env("LIVEPOLL_BUSY_INTERVAL_MS", &mut self.polling.busy_interval_ms);
        override_from_env("LIVEPOLL_MAX_INTERVAL_MS", &mut self.polling.max_interval_ms);
        override_from_env(
            "LIVEPOLL_EVICT_AFTER_CYCLES",
            &mut self.snapshot.evict_after_cycles,
        );
    }
}

fn override_from_env<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(v) = std::env::var(key) {
        if let Ok(parsed) = v.trim().parse::<T>() {
            *target = parsed;
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: EngineConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

use serde::{Deserialize, Serialize};

/// Configuration for the snapshot store
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Evict entities not returned for this many successful polls (0 = never evict)
    #[serde(default = "default_evict_after_cycles")]
    pub evict_after_cycles: u64,
}

fn default_evict_after_cycles() -> u64 {
    10
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            evict_after_cycles: default_evict_after_cycles(),
        }
    }
}

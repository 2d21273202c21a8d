use std::collections::HashMap;

pub mod config;
pub mod differ;

pub use differ::SnapshotDiffer;


/// Last observation of a tracked entity
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Fingerprint seen on the most recent poll that returned the entity
    pub fingerprint: String,

    /// Diff cycle in which the entity was last returned by the provider
    pub last_seen_cycle: u64,
}

/// Last-observed fingerprint per entity key.
///
/// A key is present only after a successful poll has returned that entity.
/// Pure data: all change detection lives in [`SnapshotDiffer`].
#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: HashMap<String, SnapshotEntry>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&SnapshotEntry> {
        self.entries.get(key)
    }

    /// Records `fingerprint` for `key`, returning the previous fingerprint (if any)
    pub fn record(&mut self, key: &str, fingerprint: String, cycle: u64) -> Option<String> {
        let previous = self.entries.insert(
            key.to_string(),
            SnapshotEntry {
                fingerprint,
                last_seen_cycle: cycle,
            },
        );
        previous.map(|entry| entry.fingerprint)
    }

    /// Drops every entry last seen before `cycle`. Returns the number removed.
    pub fn remove_seen_before(&mut self, cycle: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_seen_cycle >= cycle);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

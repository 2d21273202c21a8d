use crate::entity::TrackedEntity;
use crate::snapshot::SnapshotStore;
use tracing::debug;

/// Detects which entities changed since the previous poll.
///
/// Every diff call is one "cycle". The store entry of every entity in the batch
/// is refreshed, changed or not, so an identical follow-up batch yields nothing.
#[derive(Debug)]
pub struct SnapshotDiffer {
    store: SnapshotStore,
    cycle: u64,
    evict_after_cycles: u64,
}

impl SnapshotDiffer {
    pub fn new(evict_after_cycles: u64) -> Self {
        Self {
            store: SnapshotStore::new(),
            cycle: 0,
            evict_after_cycles,
        }
    }

    /// Returns the entities of `batch` whose fingerprint is new or different,
    /// in batch order.
    pub fn diff<'a>(&mut self, batch: &'a [TrackedEntity]) -> Vec<&'a TrackedEntity> {
        self.cycle += 1;
        let cycle = self.cycle;

        let mut changed = Vec::new();
        for entity in batch {
            let fingerprint = entity.fingerprint();
            let unchanged = self
                .store
                .get(&entity.id)
                .is_some_and(|entry| entry.fingerprint == fingerprint);

            self.store.record(&entity.id, fingerprint, cycle);
            if !unchanged {
                changed.push(entity);
            }
        }

        self.evict_stale();
        changed
    }

    /// Drops entries the provider has not returned for more than `evict_after_cycles` cycles.
    fn evict_stale(&mut self) {
        if self.evict_after_cycles == 0 || self.cycle <= self.evict_after_cycles {
            return;
        }
        let evicted = self
            .store
            .remove_seen_before(self.cycle - self.evict_after_cycles);
        if evicted > 0 {
            debug!(evicted = evicted, cycle = self.cycle, "Evicted stale snapshot entries");
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Forgets every fingerprint, so the next diff reports the whole batch.
    pub fn reset(&mut self) {
        self.store.clear();
        self.cycle = 0;
    }
}

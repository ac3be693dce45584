//! Per-item mutation locks.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api::{Annotation, ItemId};

/// Exclusive access to one item, carrying the annotation confirmed by the
/// previous holder (if that holder finished while this one waited).
pub type ItemGuard = OwnedMutexGuard<Option<Annotation>>;

/// Per-item async mutex.
///
/// Mutations on the same item are serialized, and each holder derives its
/// change from the state the previous holder confirmed; different items
/// proceed concurrently. Entries live only while held or awaited.
#[derive(Clone, Default)]
pub struct ItemLocks {
    locks: Arc<DashMap<ItemId, Arc<Mutex<Option<Annotation>>>>>,
}

impl ItemLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for `id`.
    pub fn get(&self, id: ItemId) -> Arc<Mutex<Option<Annotation>>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Acquire the lock for `id`, waiting behind any in-flight mutation.
    pub async fn acquire(&self, id: ItemId) -> ItemGuard {
        self.get(id).lock_owned().await
    }

    /// Release `guard` and drop the entries nobody holds or awaits.
    pub fn release(&self, guard: ItemGuard) {
        drop(guard);
        self.prune();
    }

    /// Drop entries nobody is holding or waiting on.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        // Only the map holds an idle lock.
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - self.locks.len()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

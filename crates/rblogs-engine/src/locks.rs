//! Per-space write serialization.
//!
//! Two writers targeting different spaces must never block each other;
//! two writers targeting the same space must never interleave (spec.md
//! §4.4, "concurrent writes to different spaces proceed independently;
//! concurrent writes to the same space serialize"). `SpaceLocks` is a
//! lazily-populated table of one `tokio::sync::Mutex` per space, garbage
//! collected as soon as nothing holds or waits on a lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{OwnedMutexGuard, Mutex as AsyncMutex};

/// Table of per-space locks, created on first use and dropped once idle.
#[derive(Default)]
pub struct SpaceLocks {
    table: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SpaceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `space_id`, creating its entry if this is the
    /// first writer to touch that space.
    pub async fn acquire(&self, space_id: &str) -> SpaceLockGuard<'_> {
        let entry = {
            let mut table = self.table.lock().expect("lock table poisoned");
            table
                .entry(space_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = entry.clone().lock_owned().await;
        SpaceLockGuard {
            locks: self,
            space_id: space_id.to_string(),
            entry,
            guard: Some(guard),
        }
    }

    /// Drop the table entry for `space_id` if nothing else references it.
    /// Called when a guard is released; keeps the table from growing
    /// unboundedly across the lifetime of a long-running process.
    fn maybe_remove(&self, space_id: &str, entry: &Arc<AsyncMutex<()>>) {
        let mut table = self.table.lock().expect("lock table poisoned");
        if Arc::strong_count(entry) <= 2 {
            table.remove(space_id);
        }
    }
}

/// Holds one space's lock for the duration of a write. Releasing the
/// underlying mutex guard and removing the table entry (if idle) happen
/// together on drop.
pub struct SpaceLockGuard<'a> {
    locks: &'a SpaceLocks,
    space_id: String,
    entry: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SpaceLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.maybe_remove(&self.space_id, &self.entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_space_serializes() {
        let locks = Arc::new(SpaceLocks::new());
        let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let l1 = locks.clone();
        let o1 = order.clone();
        let t1 = tokio::spawn(async move {
            let _g = l1.acquire("s").await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            o1.lock().await.push(1);
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        let l2 = locks.clone();
        let o2 = order.clone();
        let t2 = tokio::spawn(async move {
            let _g = l2.acquire("s").await;
            o2.lock().await.push(2);
        });

        t1.await.unwrap();
        t2.await.unwrap();
        assert_eq!(*order.lock().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn table_entry_is_removed_once_idle() {
        let locks = SpaceLocks::new();
        {
            let _g = locks.acquire("s").await;
        }
        assert!(locks.table.lock().unwrap().is_empty());
    }
}

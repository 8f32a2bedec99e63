//! Storage accounting (C12): a single-pass byte estimate across every
//! event and snapshot, tallied per space.

use rblogs_contracts::{error::RblogsResult, report::{SpaceUsage, StorageReport}};

use crate::engine::Engine;

fn estimated_size<T: serde::Serialize>(value: &T) -> u64 {
    serde_json::to_string(value).map(|s| s.len() as u64).unwrap_or(0)
}

impl Engine {
    /// Tally event and snapshot byte estimates across the whole store,
    /// with a per-space breakdown sorted by `space_id` (spec.md §4.12).
    pub async fn get_storage_usage(&self) -> RblogsResult<StorageReport> {
        let total_events = self.store.total_event_count().await?;
        let total_snapshots = self.store.total_snapshot_count().await?;
        let (earliest_timestamp, latest_timestamp) =
            self.store.earliest_and_latest_timestamp().await?;
        let space_ids = self.store.distinct_space_ids().await?;

        let mut estimated_bytes: u64 = 0;
        let mut per_space = Vec::with_capacity(space_ids.len());

        for space_id in &space_ids {
            let events = self.load_events_after(space_id, None).await?;
            let bytes: u64 = events.iter().map(estimated_size).sum();
            estimated_bytes += bytes;
            per_space.push(SpaceUsage {
                space_id: space_id.clone(),
                event_count: events.len() as u64,
                estimated_bytes: bytes,
            });

            for snapshot in self.store.scan_snapshots_by_space(space_id).await? {
                estimated_bytes += estimated_size(&snapshot);
            }
        }
        per_space.sort_by(|a, b| a.space_id.cmp(&b.space_id));

        Ok(StorageReport {
            total_events,
            total_snapshots,
            estimated_bytes,
            per_space,
            earliest_timestamp,
            latest_timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rblogs_contracts::event::{EventInput, EventType};
    use rblogs_core::{IdGenerator, RecordStore, StateReducer};
    use rblogs_store::SledStore;
    use std::sync::{atomic::AtomicU64, Arc};

    fn make_engine() -> Arc<Engine> {
        let store: Arc<dyn RecordStore> = Arc::new(SledStore::temporary().unwrap());
        let counter = AtomicU64::new(0);
        let id_generator: Arc<IdGenerator> = Arc::new(Box::new(move || {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            format!("id-{n}")
        }));
        let state_reducer: Arc<StateReducer> =
            Arc::new(Box::new(|_prior, _event| serde_json::Value::Null));
        Arc::new(Engine::new(store, id_generator, state_reducer, 0))
    }

    #[tokio::test]
    async fn usage_tallies_events_per_space_sorted() {
        let engine = make_engine();
        for (space, minute) in [("b", 0), ("a", 1), ("a", 2)] {
            let input = EventInput {
                event_type: EventType::SystemEvent,
                space_id: space.to_string(),
                timestamp: format!("2026-01-01T00:{:02}:00Z", minute),
                version: 1,
                payload: Default::default(),
            };
            engine.write_event(input).await.unwrap();
        }

        let report = engine.get_storage_usage().await.unwrap();
        assert_eq!(report.total_events, 3);
        assert_eq!(report.per_space.len(), 2);
        assert_eq!(report.per_space[0].space_id, "a");
        assert_eq!(report.per_space[0].event_count, 2);
        assert_eq!(report.per_space[1].space_id, "b");
        assert!(report.estimated_bytes > 0);
        assert_eq!(report.earliest_timestamp.as_deref(), Some("2026-01-01T00:00:00Z"));
        assert_eq!(report.latest_timestamp.as_deref(), Some("2026-01-01T00:02:00Z"));
    }
}

//! Snapshot manager (C7): checkpoints reducer-derived state so
//! reconstruction never has to replay a space's full history.

use rblogs_contracts::{
    error::{RblogsError, RblogsResult},
    event::Event,
    query::Order,
    snapshot::Snapshot,
};
use rblogs_core::canonical_hash;
use tracing::debug;

use crate::engine::Engine;

/// Events pulled per `scan_events_by_space` call while folding toward a
/// new snapshot.
const CHUNK_SIZE: usize = 500;

impl Engine {
    /// Fold every event since the latest snapshot (or the whole history,
    /// if none exists) through the state reducer and persist the result
    /// as a new snapshot.
    ///
    /// Fails with `SnapshotFailed` if the space has no events at all, or
    /// if it already has a snapshot covering its latest event (spec.md
    /// §4.7).
    pub async fn create_snapshot(&self, space_id: &str) -> RblogsResult<Snapshot> {
        let prior = self.store.latest_snapshot_for_space(space_id).await?;
        let new_events = self.load_events_after(space_id, prior.as_ref().map(|s| s.event_sequence_number)).await?;

        if new_events.is_empty() {
            let reason = if prior.is_none() {
                "no events"
            } else {
                "already compacted"
            };
            return Err(RblogsError::SnapshotFailed {
                space_id: space_id.to_string(),
                reason: reason.to_string(),
            });
        }

        let mut state = prior.as_ref().map(|s| s.state.clone());
        for event in &new_events {
            let next = (self.state_reducer)(state.as_ref(), event);
            state = Some(next);
        }
        let state = state.unwrap_or(serde_json::Value::Null);

        let last = new_events.last().expect("checked non-empty above");
        let hash = canonical_hash(&state).map_err(|e| RblogsError::DatabaseError {
            operation: "create_snapshot".to_string(),
            reason: e.to_string(),
        })?;

        let snapshot = Snapshot {
            id: (self.id_generator)(),
            space_id: space_id.to_string(),
            event_sequence_number: last.sequence_number,
            timestamp: last.timestamp.clone(),
            state,
            hash,
        };

        self.store.insert_snapshot(&snapshot).await?;
        debug!(space_id, event_sequence_number = snapshot.event_sequence_number, "snapshot created");
        Ok(snapshot)
    }

    /// Whether `space_id` has accumulated at least `interval` events
    /// since its latest snapshot (or since genesis, if it has none).
    pub async fn should_auto_snapshot(&self, space_id: &str, interval: u64) -> RblogsResult<bool> {
        if interval == 0 {
            return Ok(false);
        }
        let since = self.events_since_last_snapshot(space_id).await?;
        Ok(since >= interval)
    }

    pub(crate) async fn events_since_last_snapshot(&self, space_id: &str) -> RblogsResult<u64> {
        let prior = self.store.latest_snapshot_for_space(space_id).await?;
        let total = self.store.count_events_in_space(space_id).await?;
        Ok(match prior {
            Some(s) => total.saturating_sub(s.event_sequence_number),
            None => total,
        })
    }

    /// Load every event in `space_id` with `sequence_number > after`
    /// (or every event, if `after` is `None`), in ascending order.
    pub(crate) async fn load_events_after(
        &self,
        space_id: &str,
        after: Option<u64>,
    ) -> RblogsResult<Vec<Event>> {
        let mut all = Vec::new();
        let mut cursor_seq = after;
        loop {
            let chunk = self
                .store
                .scan_events_by_space(space_id, cursor_seq, Order::Asc, CHUNK_SIZE)
                .await?;
            if chunk.is_empty() {
                break;
            }
            let got_full_chunk = chunk.len() == CHUNK_SIZE;
            cursor_seq = chunk.last().map(|e| e.sequence_number);
            all.extend(chunk);
            if !got_full_chunk {
                break;
            }
        }
        Ok(all)
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
        let state_reducer: Arc<StateReducer> = Arc::new(Box::new(|prior, event| {
            let mut count = prior.and_then(|v| v.get("count")).and_then(|v| v.as_i64()).unwrap_or(0);
            count += 1;
            serde_json::json!({ "count": count, "last_event": event.id })
        }));
        Arc::new(Engine::new(store, id_generator, state_reducer, 0))
    }

    async fn write(engine: &Arc<Engine>, space_id: &str, i: u64) {
        let input = EventInput {
            event_type: EventType::SystemEvent,
            space_id: space_id.to_string(),
            timestamp: format!("2026-01-01T00:{:02}:00Z", i),
            version: 1,
            payload: Default::default(),
        };
        engine.write_event(input).await.unwrap();
    }

    #[tokio::test]
    async fn snapshot_folds_all_events_when_none_exists() {
        let engine = make_engine();
        for i in 0..3 {
            write(&engine, "s", i).await;
        }
        let snap = engine.create_snapshot("s").await.unwrap();
        assert_eq!(snap.event_sequence_number, 3);
        assert_eq!(snap.state["count"], 3);
    }

    #[tokio::test]
    async fn snapshot_with_no_events_fails() {
        let engine = make_engine();
        let err = engine.create_snapshot("empty").await.unwrap_err();
        assert!(matches!(err, RblogsError::SnapshotFailed { .. }));
    }

    #[tokio::test]
    async fn repeated_snapshot_with_no_new_events_fails() {
        let engine = make_engine();
        write(&engine, "s", 0).await;
        engine.create_snapshot("s").await.unwrap();
        let err = engine.create_snapshot("s").await.unwrap_err();
        match err {
            RblogsError::SnapshotFailed { reason, .. } => assert_eq!(reason, "already compacted"),
            other => panic!("expected SnapshotFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn should_auto_snapshot_respects_interval() {
        let engine = make_engine();
        for i in 0..3 {
            write(&engine, "s", i).await;
        }
        assert!(engine.should_auto_snapshot("s", 3).await.unwrap());
        assert!(!engine.should_auto_snapshot("s", 10).await.unwrap());
    }
}

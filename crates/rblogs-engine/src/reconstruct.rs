//! State reconstructor (C8): fold a space's events — from its nearest
//! prior snapshot, or from genesis — into a point-in-time state value.

use chrono::DateTime;
use rblogs_contracts::{error::{RblogsError, RblogsResult}, query::Order};
use tracing::debug;

use crate::engine::Engine;

impl Engine {
    /// Reconstruct `space_id`'s state as of `at_timestamp`, or the
    /// latest state if `at_timestamp` is `None` (spec.md §4.8).
    pub async fn reconstruct_state(
        &self,
        space_id: &str,
        at_timestamp: Option<&str>,
    ) -> RblogsResult<serde_json::Value> {
        if let Some(ts) = at_timestamp {
            if DateTime::parse_from_rfc3339(ts).is_err() {
                return Err(RblogsError::InvalidQuery {
                    field: "atTimestamp".to_string(),
                    reason: "must be a valid RFC 3339 timestamp".to_string(),
                });
            }
        }

        let first = self
            .store
            .scan_events_by_space(space_id, None, Order::Asc, 1)
            .await?;
        let earliest = match first.first() {
            Some(e) => e.timestamp.clone(),
            None => {
                return Err(RblogsError::InvalidQuery {
                    field: "spaceId".to_string(),
                    reason: "space has no events".to_string(),
                })
            }
        };

        if let Some(ts) = at_timestamp {
            if ts < earliest.as_str() {
                return Err(RblogsError::InvalidQuery {
                    field: "atTimestamp".to_string(),
                    reason: "timestamp predates the space's earliest event".to_string(),
                });
            }
        }

        let snapshot = match at_timestamp {
            None => self.store.latest_snapshot_for_space(space_id).await?,
            Some(ts) => {
                let mut candidates = self.store.scan_snapshots_by_space(space_id).await?;
                candidates.retain(|s| s.timestamp.as_str() <= ts);
                candidates.into_iter().last()
            }
        };

        let mut state = snapshot.as_ref().map(|s| s.state.clone());
        let after_seq = snapshot.as_ref().map(|s| s.event_sequence_number);
        let mut events = self.load_events_after(space_id, after_seq).await?;
        if let Some(ts) = at_timestamp {
            events.retain(|e| e.timestamp.as_str() <= ts);
        }

        for event in &events {
            state = Some((self.state_reducer)(state.as_ref(), event));
        }

        debug!(space_id, folded = events.len(), used_snapshot = snapshot.is_some(), "state reconstructed");
        Ok(state.unwrap_or(serde_json::Value::Null))
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

    async fn write(engine: &Arc<Engine>, space_id: &str, minute: u64) {
        let input = EventInput {
            event_type: EventType::SystemEvent,
            space_id: space_id.to_string(),
            timestamp: format!("2026-01-01T00:{:02}:00Z", minute),
            version: 1,
            payload: Default::default(),
        };
        engine.write_event(input).await.unwrap();
    }

    #[tokio::test]
    async fn reconstructs_latest_state_without_timestamp() {
        let engine = make_engine();
        for i in 0..3 {
            write(&engine, "s", i).await;
        }
        let state = engine.reconstruct_state("s", None).await.unwrap();
        assert_eq!(state["count"], 3);
    }

    #[tokio::test]
    async fn reconstructs_state_at_an_earlier_timestamp() {
        let engine = make_engine();
        for i in 0..3 {
            write(&engine, "s", i).await;
        }
        let state = engine
            .reconstruct_state("s", Some("2026-01-01T00:01:00Z"))
            .await
            .unwrap();
        assert_eq!(state["count"], 2);
    }

    #[tokio::test]
    async fn uses_nearest_snapshot_at_or_before_timestamp() {
        let engine = make_engine();
        for i in 0..2 {
            write(&engine, "s", i).await;
        }
        engine.create_snapshot("s").await.unwrap();
        write(&engine, "s", 5).await;

        let state = engine
            .reconstruct_state("s", Some("2026-01-01T00:05:00Z"))
            .await
            .unwrap();
        assert_eq!(state["count"], 3);
    }

    #[tokio::test]
    async fn empty_space_is_invalid_query() {
        let engine = make_engine();
        let err = engine.reconstruct_state("empty", None).await.unwrap_err();
        match err {
            RblogsError::InvalidQuery { field, .. } => assert_eq!(field, "spaceId"),
            other => panic!("expected InvalidQuery, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timestamp_before_earliest_event_is_invalid_query() {
        let engine = make_engine();
        write(&engine, "s", 5).await;
        let err = engine
            .reconstruct_state("s", Some("2026-01-01T00:00:00Z"))
            .await
            .unwrap_err();
        match err {
            RblogsError::InvalidQuery { field, .. } => assert_eq!(field, "atTimestamp"),
            other => panic!("expected InvalidQuery, got {other:?}"),
        }
    }
}

//! Write pipeline (C4): validate, serialize per-space, link, hash, persist.

use std::sync::Arc;

use chrono::DateTime;
use rblogs_contracts::{
    error::{RblogsError, RblogsResult},
    event::{Event, EventHashInput, EventInput},
};
use rblogs_core::{canonical_hash, next_link};
use tracing::{debug, info, warn};

use crate::engine::Engine;

impl Engine {
    /// Append `input` to its space's chain and return the stored `Event`.
    ///
    /// Validation (spec.md §4.4): `space_id` must be non-empty once
    /// trimmed; `timestamp` must be a non-empty RFC 3339 string; `version`
    /// must be at least 1. `event_type` needs no further check — it is
    /// already constrained to the eleven-member enum at the type level.
    ///
    /// Writes to the same space never interleave; writes to different
    /// spaces proceed independently. After the event is durably stored,
    /// an auto-snapshot check is kicked off in the background and does
    /// not delay the caller. Takes `self` behind an `Arc` so that
    /// background check can keep the engine alive after `write_event`
    /// returns.
    pub async fn write_event(self: &Arc<Self>, input: EventInput) -> RblogsResult<Event> {
        validate_input(&input)?;

        let guard = self.locks.acquire(&input.space_id).await;

        let link = next_link(self.store.as_ref(), &input.space_id).await?;
        let id = (self.id_generator)();

        let hash_input = EventHashInput {
            id: &id,
            event_type: input.event_type,
            space_id: &input.space_id,
            timestamp: &input.timestamp,
            sequence_number: link.next_sequence_number,
            previous_hash: link.previous_hash.as_deref(),
            version: input.version,
            payload: &input.payload,
        };
        let hash = canonical_hash(&hash_input).map_err(|e| RblogsError::DatabaseError {
            operation: "write_event".to_string(),
            reason: e.to_string(),
        })?;

        let event = Event {
            id,
            event_type: input.event_type,
            space_id: input.space_id.clone(),
            timestamp: input.timestamp,
            sequence_number: link.next_sequence_number,
            hash,
            previous_hash: link.previous_hash,
            version: input.version,
            payload: input.payload,
        };

        self.store.insert_event(&event).await?;
        debug!(space_id = %event.space_id, sequence_number = event.sequence_number, "event written");
        drop(guard);

        self.spawn_auto_snapshot_check(event.space_id.clone());

        Ok(event)
    }

    /// Fire-and-forget: if the space has accumulated `snapshot_interval`
    /// events since its last snapshot, compact it. Failures are logged,
    /// never propagated — a missed auto-snapshot does not fail the write
    /// that triggered it (Open Question resolution, see DESIGN.md).
    fn spawn_auto_snapshot_check(self: &Arc<Self>, space_id: String) {
        if self.snapshot_interval == 0 {
            return;
        }
        let engine = self.clone();
        let interval = self.snapshot_interval;
        tokio::spawn(async move {
            match engine.should_auto_snapshot(&space_id, interval).await {
                Ok(true) => match engine.create_snapshot(&space_id).await {
                    Ok(snap) => info!(space_id = %space_id, snapshot_id = %snap.id, "auto-snapshot created"),
                    Err(e) => warn!(space_id = %space_id, error = %e, "auto-snapshot failed"),
                },
                Ok(false) => {}
                Err(e) => warn!(space_id = %space_id, error = %e, "auto-snapshot check failed"),
            }
        });
    }
}

fn validate_input(input: &EventInput) -> RblogsResult<()> {
    if input.space_id.trim().is_empty() {
        return Err(RblogsError::InvalidEvent {
            field: "spaceId".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if input.timestamp.trim().is_empty() {
        return Err(RblogsError::InvalidEvent {
            field: "timestamp".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if DateTime::parse_from_rfc3339(&input.timestamp).is_err() {
        return Err(RblogsError::InvalidEvent {
            field: "timestamp".to_string(),
            reason: "must be a valid RFC 3339 timestamp".to_string(),
        });
    }
    if input.version < 1 {
        return Err(RblogsError::InvalidEvent {
            field: "version".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

//! Diff source reconstructor (C15): replay a space's `space_evolved`
//! AST diffs over its genesis `space_created` source, verifying each
//! step's declared hash along the way.

use chrono::DateTime;
use rblogs_contracts::{
    error::{RblogsError, RblogsResult},
    event::{Event, EventType, Payload},
    report::ReconstructedSource,
};
use rblogs_core::{canonical_hash, RecordStore};
use serde_json::Value;

use crate::export::load_all_ascending;

/// Rebuild `space_id`'s source as of `at_timestamp` (or its latest state,
/// if `None`) by applying every `space_evolved` event's `ast_diff` over
/// the genesis `space_created` event's `source` (spec.md §4.15).
///
/// Only applies to spaces whose genesis event carries `source` and
/// `source_hash` payload fields; everything else surfaces as
/// `InvalidEvent`.
pub async fn reconstruct_source(
    store: &dyn RecordStore,
    space_id: &str,
    at_timestamp: Option<&str>,
) -> RblogsResult<ReconstructedSource> {
    if let Some(ts) = at_timestamp {
        if DateTime::parse_from_rfc3339(ts).is_err() {
            return Err(RblogsError::InvalidQuery {
                field: "atTimestamp".to_string(),
                reason: "must be a valid RFC 3339 timestamp".to_string(),
            });
        }
    }

    let mut events = load_all_ascending(store, space_id).await?;
    if let Some(ts) = at_timestamp {
        events.retain(|e| e.timestamp.as_str() <= ts);
    }

    let genesis = events.first().ok_or_else(|| RblogsError::InvalidQuery {
        field: "spaceId".to_string(),
        reason: "space has no events".to_string(),
    })?;
    if genesis.event_type != EventType::SpaceCreated {
        return Err(RblogsError::InvalidEvent {
            field: "type".to_string(),
            reason: "genesis event is not space_created".to_string(),
        });
    }
    let source_str = payload_str(&genesis.payload, "source").ok_or_else(|| RblogsError::InvalidEvent {
        field: "source".to_string(),
        reason: "genesis event does not carry a 'source' payload field".to_string(),
    })?;
    let declared_hash = payload_str(&genesis.payload, "source_hash").ok_or_else(|| {
        RblogsError::InvalidEvent {
            field: "sourceHash".to_string(),
            reason: "genesis event does not carry a 'source_hash' payload field".to_string(),
        }
    })?;

    let mut state: Value = serde_json::from_str(&source_str).unwrap_or_else(|_| serde_json::json!({ "source": source_str }));
    verify_step_hash(&state, &declared_hash, 0)?;

    let mut steps_applied: u64 = 0;
    for (i, event) in events.iter().enumerate().skip(1) {
        if event.event_type != EventType::SpaceEvolved {
            continue;
        }
        apply_diff_event(&mut state, event, i)?;
        steps_applied += 1;
    }

    Ok(ReconstructedSource {
        space_id: space_id.to_string(),
        as_of_timestamp: at_timestamp.map(|s| s.to_string()),
        source: state,
        steps_applied,
    })
}

fn apply_diff_event(state: &mut Value, event: &Event, step: usize) -> RblogsResult<()> {
    let ast_diff = event
        .payload
        .get("ast_diff")
        .and_then(|v| v.as_array())
        .ok_or_else(|| RblogsError::InvalidEvent {
            field: "astDiff".to_string(),
            reason: format!("step {step}: space_evolved event missing 'ast_diff'"),
        })?;
    let declared_hash = payload_str(&event.payload, "source_hash").ok_or_else(|| RblogsError::InvalidEvent {
        field: "sourceHash".to_string(),
        reason: format!("step {step}: missing 'source_hash'"),
    })?;

    for op in ast_diff {
        apply_operation(state, op, step)?;
    }

    verify_step_hash(state, &declared_hash, step)
}

fn verify_step_hash(state: &Value, declared_hash: &str, step: usize) -> RblogsResult<()> {
    let computed = canonical_hash(state).map_err(|e| RblogsError::DatabaseError {
        operation: "reconstruct_source".to_string(),
        reason: e.to_string(),
    })?;
    if computed != declared_hash {
        return Err(RblogsError::InvalidEvent {
            field: "sourceHash".to_string(),
            reason: format!("step {step}: expected {declared_hash}, got {computed}"),
        });
    }
    Ok(())
}

fn apply_operation(state: &mut Value, op: &Value, step: usize) -> RblogsResult<()> {
    let obj = op.as_object().ok_or_else(|| RblogsError::InvalidEvent {
        field: "astDiff".to_string(),
        reason: format!("step {step}: diff entry is not an object"),
    })?;
    let path = obj
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RblogsError::InvalidEvent {
            field: "astDiff".to_string(),
            reason: format!("step {step}: diff entry missing 'path'"),
        })?;
    let operation = obj
        .get("operation")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RblogsError::InvalidEvent {
            field: "astDiff".to_string(),
            reason: format!("step {step}: diff entry missing 'operation'"),
        })?;
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();

    match operation {
        "add" | "modify" => {
            let after = obj.get("after").cloned().unwrap_or(Value::Null);
            set_at_path(state, &segments, after);
            Ok(())
        }
        "remove" => {
            remove_at_path(state, &segments);
            Ok(())
        }
        other => Err(RblogsError::InvalidEvent {
            field: "astDiff".to_string(),
            reason: format!("step {step}: unknown diff operation '{other}'"),
        }),
    }
}

fn set_at_path(value: &mut Value, segments: &[&str], new_value: Value) {
    if segments.is_empty() {
        *value = new_value;
        return;
    }
    if !value.is_object() {
        *value = Value::Object(serde_json::Map::new());
    }
    let obj = value.as_object_mut().expect("just coerced to an object");
    if segments.len() == 1 {
        obj.insert(segments[0].to_string(), new_value);
    } else {
        let child = obj
            .entry(segments[0].to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        set_at_path(child, &segments[1..], new_value);
    }
}

fn remove_at_path(value: &mut Value, segments: &[&str]) {
    if segments.is_empty() {
        return;
    }
    if let Some(obj) = value.as_object_mut() {
        if segments.len() == 1 {
            obj.remove(segments[0]);
        } else if let Some(child) = obj.get_mut(segments[0]) {
            remove_at_path(child, &segments[1..]);
        }
    }
}

fn payload_str(payload: &Payload, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rblogs_core::{canonical_hash, next_link};
    use rblogs_store::SledStore;
    use serde_json::json;

    async fn write(store: &SledStore, space_id: &str, event_type: EventType, minute: u64, payload: Payload) -> Event {
        let link = next_link(store, space_id).await.unwrap();
        let id = format!("{space_id}-{}", link.next_sequence_number);
        let timestamp = format!("2026-01-01T00:{:02}:00Z", minute);
        let hash_input = rblogs_contracts::event::EventHashInput {
            id: &id,
            event_type,
            space_id,
            timestamp: &timestamp,
            sequence_number: link.next_sequence_number,
            previous_hash: link.previous_hash.as_deref(),
            version: 1,
            payload: &payload,
        };
        let hash = canonical_hash(&hash_input).unwrap();
        let event = Event {
            id,
            event_type,
            space_id: space_id.to_string(),
            timestamp,
            sequence_number: link.next_sequence_number,
            hash,
            previous_hash: link.previous_hash,
            version: 1,
            payload,
        };
        store.insert_event(&event).await.unwrap();
        event
    }

    fn payload_with(entries: Vec<(&str, Value)>) -> Payload {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[tokio::test]
    async fn reconstructs_source_through_one_diff_step() {
        let store = SledStore::temporary().unwrap();
        let initial = json!({ "greeting": "hello" });
        let genesis_hash = canonical_hash(&initial).unwrap();
        write(
            &store,
            "s",
            EventType::SpaceCreated,
            0,
            payload_with(vec![
                ("source", Value::String(initial.to_string())),
                ("source_hash", Value::String(genesis_hash)),
            ]),
        )
        .await;

        let mut evolved = initial.clone();
        evolved["greeting"] = Value::String("hi".to_string());
        let step_hash = canonical_hash(&evolved).unwrap();
        write(
            &store,
            "s",
            EventType::SpaceEvolved,
            1,
            payload_with(vec![
                (
                    "ast_diff",
                    json!([{ "path": "greeting", "operation": "modify", "after": "hi" }]),
                ),
                ("source_hash", Value::String(step_hash)),
            ]),
        )
        .await;

        let result = reconstruct_source(&store, "s", None).await.unwrap();
        assert_eq!(result.steps_applied, 1);
        assert_eq!(result.source["greeting"], "hi");
    }

    #[tokio::test]
    async fn mismatched_hash_is_invalid_event() {
        let store = SledStore::temporary().unwrap();
        let initial = json!({ "a": 1 });
        write(
            &store,
            "s",
            EventType::SpaceCreated,
            0,
            payload_with(vec![
                ("source", Value::String(initial.to_string())),
                ("source_hash", Value::String("WRONG".to_string())),
            ]),
        )
        .await;

        let err = reconstruct_source(&store, "s", None).await.unwrap_err();
        match err {
            RblogsError::InvalidEvent { field, .. } => assert_eq!(field, "sourceHash"),
            other => panic!("expected InvalidEvent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_source_fields_is_invalid_event() {
        let store = SledStore::temporary().unwrap();
        write(&store, "s", EventType::SpaceCreated, 0, Payload::new()).await;
        let err = reconstruct_source(&store, "s", None).await.unwrap_err();
        match err {
            RblogsError::InvalidEvent { field, .. } => assert_eq!(field, "source"),
            other => panic!("expected InvalidEvent, got {other:?}"),
        }
    }
}

//! Archive importer (C11): ordered validation, per-event shape checks,
//! per-space chain re-verification, then dedup-on-insert.

use std::collections::BTreeMap;

use rblogs_contracts::{
    error::{RblogsError, RblogsResult},
    event::{Event, EventType, Payload},
    report::{ImportEventError, ImportReport},
};
use rblogs_core::{verify_chain_links, RecordStore};
use tracing::{info, warn};

use crate::{codec, export::describe_broken_link};

/// Decode, validate, and insert the events in `bytes` (spec.md §4.11).
///
/// Header/footer validation (length, magic, version, decompression,
/// footer hash, declared-vs-actual count) fails the whole import; a
/// malformed individual record is instead recorded in
/// `ImportReport::errors` and simply not inserted. A broken hash chain
/// within any one space still fails the whole import, since partial
/// insertion of a broken chain would leave the store inconsistent.
pub async fn import_archive(store: &dyn RecordStore, bytes: &[u8]) -> RblogsResult<ImportReport> {
    let decoded = codec::decode(bytes)?;

    let value: serde_json::Value =
        serde_json::from_slice(&decoded.body).map_err(|e| RblogsError::ImportFailed {
            reason: format!("archive body is not valid JSON: {e}"),
            event_id: None,
        })?;
    let array = value.as_array().ok_or_else(|| RblogsError::ImportFailed {
        reason: "archive body is not a JSON array".to_string(),
        event_id: None,
    })?;
    if array.len() as u32 != decoded.declared_count {
        return Err(RblogsError::ImportFailed {
            reason: format!(
                "header declares {} events, body has {}",
                decoded.declared_count,
                array.len()
            ),
            event_id: None,
        });
    }

    let mut valid_events = Vec::new();
    let mut errors = Vec::new();
    for item in array {
        match validate_and_build(item) {
            Ok(event) => valid_events.push(event),
            Err(e) => errors.push(e),
        }
    }

    let mut by_space: BTreeMap<String, Vec<Event>> = BTreeMap::new();
    for event in &valid_events {
        by_space.entry(event.space_id.clone()).or_default().push(event.clone());
    }
    for group in by_space.values_mut() {
        group.sort_by_key(|e| e.sequence_number);
        if let Some(idx) = verify_chain_links(group) {
            let (expected, actual) = describe_broken_link(group, idx);
            return Err(RblogsError::ImportFailed {
                reason: format!("chain integrity violation: expected {expected}, got {actual}"),
                event_id: Some(group[idx].id.clone()),
            });
        }
    }

    let mut imported_events = 0u64;
    let mut skipped_duplicates = 0u64;
    for event in &valid_events {
        if store.get_event(&event.id).await?.is_some() {
            skipped_duplicates += 1;
        } else {
            store.insert_event(event).await?;
            imported_events += 1;
        }
    }

    if !errors.is_empty() {
        warn!(malformed = errors.len(), "archive import skipped malformed records");
    }
    info!(imported_events, skipped_duplicates, "archive import complete");

    Ok(ImportReport {
        imported_events,
        skipped_duplicates,
        errors,
    })
}

/// Validate one archive record's JSON shape and build the `Event` it
/// describes. Returns an `ImportEventError` (not a hard failure) for any
/// per-record defect, quoting the record's `id` if it has one.
fn validate_and_build(value: &serde_json::Value) -> Result<Event, ImportEventError> {
    let fail = |id: &str, reason: &str| ImportEventError {
        event_id: id.to_string(),
        reason: reason.to_string(),
    };

    let obj = value
        .as_object()
        .ok_or_else(|| fail("unknown", "record is not a JSON object"))?;

    let id = obj
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| fail("unknown", "missing or non-string 'id'"))?
        .to_string();

    let type_str = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| fail(&id, "missing or non-string 'type'"))?;
    let event_type = EventType::ALL
        .iter()
        .copied()
        .find(|t| t.as_str() == type_str)
        .ok_or_else(|| fail(&id, &format!("unknown event type '{type_str}'")))?;

    let space_id = obj
        .get("space_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| fail(&id, "missing or non-string 'space_id'"))?
        .to_string();
    let timestamp = obj
        .get("timestamp")
        .and_then(|v| v.as_str())
        .ok_or_else(|| fail(&id, "missing or non-string 'timestamp'"))?
        .to_string();
    let sequence_number = obj
        .get("sequence_number")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| fail(&id, "missing or non-numeric 'sequence_number'"))?;
    let hash = obj
        .get("hash")
        .and_then(|v| v.as_str())
        .ok_or_else(|| fail(&id, "missing or non-string 'hash'"))?
        .to_string();
    let previous_hash = match obj.get("previous_hash") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(fail(&id, "'previous_hash' must be a string or null")),
    };
    let version = obj
        .get("version")
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
        .ok_or_else(|| fail(&id, "missing or non-numeric 'version'"))?;
    let payload = match obj.get("payload") {
        Some(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Payload>(),
        _ => return Err(fail(&id, "'payload' must be an object")),
    };

    Ok(Event {
        id,
        event_type,
        space_id,
        timestamp,
        sequence_number,
        hash,
        previous_hash,
        version,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rblogs_core::canonical_hash;
    use rblogs_store::SledStore;
    use serde_json::json;

    fn hashed(seq: u64, previous_hash: Option<&str>) -> Event {
        let hash_input = rblogs_contracts::event::EventHashInput {
            id: &format!("evt-{seq}"),
            event_type: EventType::SystemEvent,
            space_id: "s",
            timestamp: "2026-01-01T00:00:00Z",
            sequence_number: seq,
            previous_hash,
            version: 1,
            payload: &Default::default(),
        };
        let hash = canonical_hash(&hash_input).unwrap();
        Event {
            id: format!("evt-{seq}"),
            event_type: EventType::SystemEvent,
            space_id: "s".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            sequence_number: seq,
            hash,
            previous_hash: previous_hash.map(|s| s.to_string()),
            version: 1,
            payload: Default::default(),
        }
    }

    #[tokio::test]
    async fn imports_a_valid_archive() {
        let e1 = hashed(1, None);
        let e2 = hashed(2, Some(&e1.hash));
        let archive = codec::encode(&[e1, e2]).unwrap();

        let store = SledStore::temporary().unwrap();
        let report = import_archive(&store, &archive).await.unwrap();
        assert_eq!(report.imported_events, 2);
        assert_eq!(report.skipped_duplicates, 0);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn skips_duplicates_already_present() {
        let e1 = hashed(1, None);
        let archive = codec::encode(std::slice::from_ref(&e1)).unwrap();

        let store = SledStore::temporary().unwrap();
        store.insert_event(&e1).await.unwrap();
        let report = import_archive(&store, &archive).await.unwrap();
        assert_eq!(report.imported_events, 0);
        assert_eq!(report.skipped_duplicates, 1);
    }

    #[tokio::test]
    async fn malformed_record_is_reported_not_inserted() {
        let body_with_bad_record = json!([
            {
                "id": "evt-1",
                "type": "space_created",
                "space_id": "s",
                "timestamp": "2026-01-01T00:00:00Z",
                "sequence_number": 1,
                "hash": "h",
                "previous_hash": null,
                "version": 1,
                "payload": {}
            },
            {
                "id": "evt-bad",
                "type": "not_a_real_type",
                "space_id": "s",
                "timestamp": "2026-01-01T00:01:00Z",
                "sequence_number": 2,
                "hash": "h2",
                "previous_hash": "h",
                "version": 1,
                "payload": {}
            }
        ]);
        let body = serde_json::to_vec(&body_with_bad_record).unwrap();
        use flate2::{write::DeflateEncoder, Compression};
        use sha2::{Digest, Sha256};
        use std::io::Write;
        let footer = hex::encode(Sha256::digest(&body));
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body).unwrap();
        let compressed = encoder.finish().unwrap();
        let mut archive = Vec::new();
        archive.extend_from_slice(codec::MAGIC);
        archive.push(codec::VERSION);
        archive.extend_from_slice(&2u32.to_be_bytes());
        archive.extend_from_slice(&compressed);
        archive.extend_from_slice(footer.as_bytes());

        let store = SledStore::temporary().unwrap();
        let report = import_archive(&store, &archive).await.unwrap();
        assert_eq!(report.imported_events, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].event_id, "evt-bad");
    }

    #[tokio::test]
    async fn broken_chain_fails_the_whole_import() {
        let e1 = hashed(1, None);
        let mut e2 = hashed(2, Some("BOGUS"));
        e2.previous_hash = Some("BOGUS".to_string());
        let archive = codec::encode(&[e1, e2]).unwrap();

        let store = SledStore::temporary().unwrap();
        let err = import_archive(&store, &archive).await.unwrap_err();
        assert!(matches!(err, RblogsError::ImportFailed { .. }));
        assert_eq!(store.total_event_count().await.unwrap(), 0);
    }
}

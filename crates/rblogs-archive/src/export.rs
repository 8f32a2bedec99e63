//! Archive exporter (C10): select a space's events before a cutoff date,
//! re-verify their chain, and encode them as a `.rblogs` archive.

use chrono::DateTime;
use rblogs_contracts::{
    error::{RblogsError, RblogsResult},
    event::Event,
    query::Order,
};
use rblogs_core::{verify_chain_links, RecordStore};

use crate::codec;

const CHUNK_SIZE: usize = 500;

/// Export every event in `space_id` with `timestamp < before_date`,
/// ordered by sequence number, as a `.rblogs` archive (spec.md §4.10).
pub async fn export_archive(
    store: &dyn RecordStore,
    space_id: &str,
    before_date: &str,
) -> RblogsResult<Vec<u8>> {
    if DateTime::parse_from_rfc3339(before_date).is_err() {
        return Err(RblogsError::InvalidQuery {
            field: "beforeDate".to_string(),
            reason: "must be a valid RFC 3339 timestamp".to_string(),
        });
    }

    let all = load_all_ascending(store, space_id).await?;
    let selected: Vec<Event> = all
        .into_iter()
        .filter(|e| e.timestamp.as_str() < before_date)
        .collect();

    if let Some(broken_idx) = verify_chain_links(&selected) {
        let (expected, actual) = describe_broken_link(&selected, broken_idx);
        return Err(RblogsError::IntegrityViolation {
            event_id: selected[broken_idx].id.clone(),
            expected,
            actual,
        });
    }

    codec::encode(&selected)
}

pub(crate) async fn load_all_ascending(store: &dyn RecordStore, space_id: &str) -> RblogsResult<Vec<Event>> {
    let mut all = Vec::new();
    let mut cursor_seq = None;
    loop {
        let chunk = store
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

/// `expected` is `"null"` at genesis, else the predecessor's hash.
/// `actual` is the broken event's `previous_hash`, or `"unknown"` if it
/// carries none at all.
pub(crate) fn describe_broken_link(events: &[Event], idx: usize) -> (String, String) {
    let expected = if idx == 0 {
        "null".to_string()
    } else {
        events[idx - 1].hash.clone()
    };
    let actual = events[idx]
        .previous_hash
        .clone()
        .unwrap_or_else(|| "unknown".to_string());
    (expected, actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rblogs_contracts::event::EventType;
    use rblogs_core::canonical_hash;
    use rblogs_store::SledStore;

    async fn seed(store: &SledStore, space_id: &str, timestamps: &[&str]) {
        let mut previous_hash: Option<String> = None;
        for (i, ts) in timestamps.iter().enumerate() {
            let seq = i as u64 + 1;
            let hash_input = rblogs_contracts::event::EventHashInput {
                id: &format!("evt-{seq}"),
                event_type: EventType::SystemEvent,
                space_id,
                timestamp: ts,
                sequence_number: seq,
                previous_hash: previous_hash.as_deref(),
                version: 1,
                payload: &Default::default(),
            };
            let hash = canonical_hash(&hash_input).unwrap();
            let event = Event {
                id: format!("evt-{seq}"),
                event_type: EventType::SystemEvent,
                space_id: space_id.to_string(),
                timestamp: ts.to_string(),
                sequence_number: seq,
                hash: hash.clone(),
                previous_hash: previous_hash.clone(),
                version: 1,
                payload: Default::default(),
            };
            store.insert_event(&event).await.unwrap();
            previous_hash = Some(hash);
        }
    }

    #[tokio::test]
    async fn exports_events_before_cutoff() {
        let store = SledStore::temporary().unwrap();
        seed(
            &store,
            "s",
            &["2026-01-01T00:00:00Z", "2026-01-02T00:00:00Z", "2026-01-03T00:00:00Z"],
        )
        .await;

        let archive = export_archive(&store, "s", "2026-01-03T00:00:00Z").await.unwrap();
        let decoded = codec::decode(&archive).unwrap();
        assert_eq!(decoded.declared_count, 2);
    }

    #[tokio::test]
    async fn rejects_invalid_before_date() {
        let store = SledStore::temporary().unwrap();
        let err = export_archive(&store, "s", "not-a-date").await.unwrap_err();
        assert!(matches!(err, RblogsError::InvalidQuery { .. }));
    }

    #[tokio::test]
    async fn detects_broken_chain_before_export() {
        let store = SledStore::temporary().unwrap();
        seed(&store, "s", &["2026-01-01T00:00:00Z"]).await;
        let mut tampered = store.get_event("evt-1").await.unwrap().unwrap();
        tampered.hash = "TAMPERED".to_string();

        let store2 = SledStore::temporary().unwrap();
        store2.insert_event(&tampered).await.unwrap();
        let bogus = Event {
            id: "evt-2".to_string(),
            event_type: EventType::SystemEvent,
            space_id: "s".to_string(),
            timestamp: "2026-01-02T00:00:00Z".to_string(),
            sequence_number: 2,
            hash: "h2".to_string(),
            previous_hash: Some("BOGUS".to_string()),
            version: 1,
            payload: Default::default(),
        };
        store2.insert_event(&bogus).await.unwrap();

        let err = export_archive(&store2, "s", "2026-01-03T00:00:00Z").await.unwrap_err();
        assert!(matches!(err, RblogsError::IntegrityViolation { .. }));
    }
}

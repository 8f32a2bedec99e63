//! Chain linker (C3): the `previous_hash` / `sequence_number` arithmetic
//! every write and every archive import relies on.

use rblogs_contracts::{error::RblogsResult, event::Event};

use crate::traits::RecordStore;

/// What the next event in a space must carry to extend its chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    pub previous_hash: Option<String>,
    pub next_sequence_number: u64,
}

/// Compute the link a new event in `space_id` must carry.
///
/// `(None, 1)` for an empty space; otherwise `(tail.hash, tail.sequence_number + 1)`
/// where `tail` is the event with the maximum `sequence_number` in that space.
pub async fn next_link(store: &dyn RecordStore, space_id: &str) -> RblogsResult<ChainLink> {
    match store.latest_event_in_space(space_id).await? {
        None => Ok(ChainLink {
            previous_hash: None,
            next_sequence_number: 1,
        }),
        Some(tail) => Ok(ChainLink {
            previous_hash: Some(tail.hash),
            next_sequence_number: tail.sequence_number + 1,
        }),
    }
}

/// Pure static check over an ordered, single-space event sequence.
///
/// Returns the index of the first broken link, or `None` if the whole
/// sequence is intact. The first element must have a `None` `previous_hash`;
/// every later element's `previous_hash` must equal its predecessor's `hash`.
pub fn verify_chain_links(sequence: &[Event]) -> Option<usize> {
    for (i, event) in sequence.iter().enumerate() {
        if i == 0 {
            if event.previous_hash.is_some() {
                return Some(0);
            }
        } else {
            let predecessor = &sequence[i - 1];
            if event.previous_hash.as_deref() != Some(predecessor.hash.as_str()) {
                return Some(i);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(seq: u64, hash: &str, previous_hash: Option<&str>) -> Event {
        use rblogs_contracts::event::EventType;
        use std::collections::BTreeMap;
        Event {
            id: format!("evt-{seq}"),
            event_type: EventType::SystemEvent,
            space_id: "s".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            sequence_number: seq,
            hash: hash.to_string(),
            previous_hash: previous_hash.map(|s| s.to_string()),
            version: 1,
            payload: BTreeMap::new(),
        }
    }

    #[test]
    fn intact_chain_returns_none() {
        let seq = vec![
            event(1, "h1", None),
            event(2, "h2", Some("h1")),
            event(3, "h3", Some("h2")),
        ];
        assert_eq!(verify_chain_links(&seq), None);
    }

    #[test]
    fn genesis_with_previous_hash_is_broken_at_zero() {
        let seq = vec![event(1, "h1", Some("bogus"))];
        assert_eq!(verify_chain_links(&seq), Some(0));
    }

    #[test]
    fn mismatched_link_is_broken_at_its_index() {
        let seq = vec![
            event(1, "h1", None),
            event(2, "h2", Some("h1")),
            event(3, "h3", Some("WRONG")),
        ];
        assert_eq!(verify_chain_links(&seq), Some(2));
    }
}

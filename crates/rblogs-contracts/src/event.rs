//! Event and event-input types.
//!
//! `Event` is the atomic, immutable append — once written it is never
//! mutated or removed. `EventInput` is what callers hand to the write
//! pipeline before a sequence number, hash, and chain link are assigned.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The fixed, enumerated set of event types. Exactly eleven members — see
/// spec.md §3. Serializes to/from its snake_case wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SpaceCreated,
    SpaceEvolved,
    SpaceForked,
    SpaceDeleted,
    StateChanged,
    ActionInvoked,
    IntentSubmitted,
    IntentQueued,
    IntentResolved,
    UserFeedback,
    SystemEvent,
}

impl EventType {
    /// All eleven variants, in declaration order. Used by the archive
    /// importer's per-event shape validation and by tests that need to
    /// enumerate the full set.
    pub const ALL: [EventType; 11] = [
        EventType::SpaceCreated,
        EventType::SpaceEvolved,
        EventType::SpaceForked,
        EventType::SpaceDeleted,
        EventType::StateChanged,
        EventType::ActionInvoked,
        EventType::IntentSubmitted,
        EventType::IntentQueued,
        EventType::IntentResolved,
        EventType::UserFeedback,
        EventType::SystemEvent,
    ];

    /// The wire name serde would produce, exposed for error messages that
    /// need to quote the type without round-tripping through serde_json.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::SpaceCreated => "space_created",
            EventType::SpaceEvolved => "space_evolved",
            EventType::SpaceForked => "space_forked",
            EventType::SpaceDeleted => "space_deleted",
            EventType::StateChanged => "state_changed",
            EventType::ActionInvoked => "action_invoked",
            EventType::IntentSubmitted => "intent_submitted",
            EventType::IntentQueued => "intent_queued",
            EventType::IntentResolved => "intent_resolved",
            EventType::UserFeedback => "user_feedback",
            EventType::SystemEvent => "system_event",
        }
    }
}

/// The payload carried by an event: an arbitrary free-form mapping from
/// string keys to JSON-compatible values. A `BTreeMap` is used (rather than
/// `serde_json::Map`, which is insertion-ordered) so that default `Debug`/
/// equality already reflects key order; canonical-serialization ordering
/// for hashing is still performed explicitly by `rblogs-core` regardless of
/// this container's own order, per spec.md §4.1.
pub type Payload = BTreeMap<String, serde_json::Value>;

/// Caller-supplied input to the write pipeline, before sequencing and
/// hashing. See `rblogs-engine`'s write pipeline for validation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInput {
    pub event_type: EventType,
    pub space_id: String,
    pub timestamp: String,
    pub version: u32,
    pub payload: Payload,
}

/// An atomic, immutable event in a space's hash chain.
///
/// Fields mirror spec.md §3 exactly. `hash` commits to every other field
/// except itself (see `rblogs-core::hash` for the canonical-serialization
/// rule that makes this well-defined).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub space_id: String,
    pub timestamp: String,
    pub sequence_number: u64,
    pub hash: String,
    pub previous_hash: Option<String>,
    pub version: u32,
    pub payload: Payload,
}

/// The subset of an event's fields that feed the hash, laid out separately
/// from `Event` so the hash input can never accidentally include `hash`
/// itself. See the "cyclic / self-referential hashes" design note in
/// spec.md §9.
#[derive(Debug, Clone, Serialize)]
pub struct EventHashInput<'a> {
    pub id: &'a str,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub space_id: &'a str,
    pub timestamp: &'a str,
    pub sequence_number: u64,
    pub previous_hash: Option<&'a str>,
    pub version: u32,
    pub payload: &'a Payload,
}

impl Event {
    /// Build the hash-input view of this event, excluding `hash` itself.
    pub fn hash_input(&self) -> EventHashInput<'_> {
        EventHashInput {
            id: &self.id,
            event_type: self.event_type,
            space_id: &self.space_id,
            timestamp: &self.timestamp,
            sequence_number: self.sequence_number,
            previous_hash: self.previous_hash.as_deref(),
            version: self.version,
            payload: &self.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_wire_names_round_trip() {
        for ty in EventType::ALL {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
            let decoded: EventType = serde_json::from_str(&json).unwrap();
            assert_eq!(decoded, ty);
        }
    }

    #[test]
    fn event_type_all_has_eleven_members() {
        assert_eq!(EventType::ALL.len(), 11);
    }
}

//! Snapshot type: a checkpoint of reducer-produced state pinned to a
//! specific event sequence number within one space.

use serde::{Deserialize, Serialize};

/// A checkpoint of derived state for one space.
///
/// `event_sequence_number` is the last event folded into `state`.
/// `timestamp` is derived from that event — never from the wall clock —
/// so that reconstruction stays deterministic. See spec.md §4.7.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub space_id: String,
    pub event_sequence_number: u64,
    pub timestamp: String,
    pub state: serde_json::Value,
    pub hash: String,
}

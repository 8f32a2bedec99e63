//! Pagination contract shared by `query_by_space`, `query_by_type`, and
//! `query_by_time` (spec.md §4.5).

use serde::{Deserialize, Serialize};

use crate::error::{RblogsError, RblogsResult};

/// Sort direction for a query page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    Desc,
}

impl Default for Order {
    fn default() -> Self {
        Order::Asc
    }
}

/// The default page size before clamping, per spec.md §4.5.
pub const DEFAULT_LIMIT: u32 = 100;
/// The floor every requested limit is clamped to (0 becomes 1).
pub const MIN_LIMIT: u32 = 1;
/// The ceiling every requested limit is clamped to, unless overridden by
/// `Config::max_events_per_query` (spec.md §6).
pub const MAX_LIMIT: u32 = 1000;

/// Caller-supplied query parameters, before clamping and cursor decoding.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub order: Option<Order>,
}

impl QueryOptions {
    /// Clamp `limit` into `[1, max]` silently — 0 becomes 1, anything past
    /// `max` becomes `max`. `max` is normally `MAX_LIMIT` but callers may
    /// pass a tighter `Config::max_events_per_query` ceiling.
    pub fn clamped_limit(&self, max: u32) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, max)
    }

    /// Resolve the effective sort order, defaulting to ascending.
    pub fn order(&self) -> Order {
        self.order.unwrap_or_default()
    }
}

/// The decoded position a cursor encodes: "resume strictly after this
/// `(sequence_number, id)` pair."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub sequence_number: u64,
    pub id: String,
}

impl CursorPosition {
    /// Encode as the opaque base64 blob callers pass back in `QueryOptions::cursor`.
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("CursorPosition is always serializable");
        base64_encode(&json)
    }

    /// Decode an opaque cursor blob. Any malformed input surfaces as
    /// `InvalidQuery { field: "cursor" }` per spec.md §4.5.
    pub fn decode(cursor: &str) -> RblogsResult<Self> {
        let bytes = base64_decode(cursor).map_err(|_| RblogsError::InvalidQuery {
            field: "cursor".to_string(),
            reason: "cursor is not valid base64".to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|_| RblogsError::InvalidQuery {
            field: "cursor".to_string(),
            reason: "cursor does not decode to a valid position".to_string(),
        })
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn base64_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(s)
}

/// One page of results from a cursor-paginated query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub total: u64,
}

//! The storage trust boundary: `RecordStore`, plus the two caller-supplied
//! callables the rest of the system treats as black boxes.
//!
//! `RecordStore` is implemented against sled in `rblogs-store`. Nothing in
//! `rblogs-engine`, `rblogs-verify`, or `rblogs-archive` reaches past this
//! trait into a concrete backend — the same boundary discipline the teacher
//! draws around `Agent`/`PolicyEngine`/`AuditWriter`/`Verifier`, here drawn
//! around a single storage seam instead of four trust tiers.

use async_trait::async_trait;
use rblogs_contracts::{
    error::RblogsResult,
    event::{Event, EventType},
    query::Order,
    snapshot::Snapshot,
};

/// Abstracts the embedded indexed record store described in spec.md §4.2:
/// an `events` table keyed by `id` with secondary indexes on `space_id`,
/// `type`, `timestamp`, `sequence_number`, and the compound
/// `(space_id, sequence_number)`; a `snapshots` table keyed by `id` with
/// indexes on `space_id` and `(space_id, event_sequence_number)`; and a
/// `metadata` table keyed by `key`.
///
/// Every method fails with `RblogsError::DatabaseError` on an underlying
/// fault. Implementations must return deterministic ordering whenever the
/// caller sorts on an explicit index.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new event. Fails if `event.id` already exists.
    async fn insert_event(&self, event: &Event) -> RblogsResult<()>;

    /// Point lookup by primary key.
    async fn get_event(&self, id: &str) -> RblogsResult<Option<Event>>;

    /// The event with the maximum `sequence_number` in `space_id`, via the
    /// `(space_id, sequence_number)` index descending, limit 1. Feeds C3.
    async fn latest_event_in_space(&self, space_id: &str) -> RblogsResult<Option<Event>>;

    /// Count of events in `space_id`.
    async fn count_events_in_space(&self, space_id: &str) -> RblogsResult<u64>;

    /// Range scan over the `(space_id, sequence_number)` index, resuming
    /// strictly after (ascending) or before (descending) `cursor_seq`, in
    /// `order`, at most `limit` rows. `cursor_seq: None` scans from the
    /// space's edge in that direction. Doubles as C6's chunked chain walk
    /// (`order: Asc`, `cursor_seq` the previous chunk's last sequence
    /// number, `limit` the chunk size) and as `query_by_space`'s page fetch
    /// (`limit` passed as the `limit + 1` overflow-row trick).
    async fn scan_events_by_space(
        &self,
        space_id: &str,
        cursor_seq: Option<u64>,
        order: Order,
        limit: usize,
    ) -> RblogsResult<Vec<Event>>;

    /// All events of `event_type`, across every space, in no particular
    /// order — the query engine applies cursor and ordering in memory.
    async fn scan_events_by_type(&self, event_type: EventType) -> RblogsResult<Vec<Event>>;

    /// Count of events of `event_type`, across every space.
    async fn count_events_by_type(&self, event_type: EventType) -> RblogsResult<u64>;

    /// All events with `timestamp` in `[from, to)`, across every space, in
    /// no particular order — the query engine applies cursor and ordering.
    async fn scan_events_by_time(&self, from: &str, to: &str) -> RblogsResult<Vec<Event>>;

    /// Count of events with `timestamp` in `[from, to)`.
    async fn count_events_by_time(&self, from: &str, to: &str) -> RblogsResult<u64>;

    /// Every distinct `space_id` that has at least one event.
    async fn distinct_space_ids(&self) -> RblogsResult<Vec<String>>;

    /// Insert a new snapshot. Fails if `snapshot.id` already exists.
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> RblogsResult<()>;

    /// The snapshot with the maximum `event_sequence_number` in `space_id`,
    /// via the `(space_id, event_sequence_number)` index descending.
    async fn latest_snapshot_for_space(&self, space_id: &str) -> RblogsResult<Option<Snapshot>>;

    /// Every snapshot in `space_id`, ascending by `event_sequence_number`.
    /// Feeds C8's nearest-snapshot-at-or-before-a-timestamp selection.
    async fn scan_snapshots_by_space(&self, space_id: &str) -> RblogsResult<Vec<Snapshot>>;

    /// Total event count across the whole store.
    async fn total_event_count(&self) -> RblogsResult<u64>;

    /// Total snapshot count across the whole store.
    async fn total_snapshot_count(&self) -> RblogsResult<u64>;

    /// `(earliest, latest)` event timestamps across the whole store, or
    /// `(None, None)` if empty.
    async fn earliest_and_latest_timestamp(&self) -> RblogsResult<(Option<String>, Option<String>)>;

    /// Read a metadata value by key.
    async fn get_metadata(&self, key: &str) -> RblogsResult<Option<String>>;

    /// Write a metadata value, overwriting any existing value for `key`.
    async fn set_metadata(&self, key: &str, value: &str) -> RblogsResult<()>;
}

/// The caller-supplied identifier generator (spec.md §1 "out of scope" —
/// only its interface matters here). Called once per new `Event` or
/// `Snapshot` id.
pub type IdGenerator = Box<dyn Fn() -> String + Send + Sync>;

/// The caller-supplied state reducer (spec.md §1 "out of scope"). An
/// arbitrary pure function from `(prior_state, event) -> next_state`; `None`
/// for the prior state means "no snapshot exists yet". Treated as
/// infallible per spec.md §4.7 and the Open Question resolution recorded in
/// `DESIGN.md`.
pub type StateReducer =
    Box<dyn Fn(Option<&serde_json::Value>, &Event) -> serde_json::Value + Send + Sync>;

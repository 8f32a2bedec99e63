//! `EventLog`: the public facade wiring a `RecordStore`, the write/query/
//! snapshot engine, the integrity verifier, and the archive codec behind
//! the operations in spec.md §6.

use std::path::Path;
use std::sync::Arc;

use rblogs_archive::{export_archive, import_archive, reconstruct_source};
use rblogs_contracts::{
    error::RblogsResult,
    event::{Event, EventInput, EventType},
    query::{Order, PaginatedResult, QueryOptions},
    report::{CompactionReport, ImportReport, IntegrityReport, PressureReport, ReconstructedSource, StorageReport},
    snapshot::Snapshot,
};
use rblogs_core::RecordStore;
use rblogs_engine::Engine;
use rblogs_store::SledStore;
use rblogs_verify::IntegrityVerifier;

use crate::config::Config;

/// An embedded, append-only event log over a `RecordStore`.
///
/// Construct with [`EventLog::open`] for the default `sled`-backed store,
/// or [`EventLog::from_store`] to wire a caller-provided `RecordStore`
/// implementation (tests most often use this with an in-memory sled
/// instance).
pub struct EventLog {
    store: Arc<dyn RecordStore>,
    engine: Arc<Engine>,
    max_events_per_query: u32,
}

impl EventLog {
    /// Open (or create) a `sled`-backed event log at `path`, stamping
    /// `config.schema_version` into the `metadata` table if this is a
    /// fresh database.
    pub async fn open(path: impl AsRef<Path>, config: Config) -> RblogsResult<Self> {
        let store: Arc<dyn RecordStore> = Arc::new(SledStore::open(path)?);
        Self::from_store(store, config).await
    }

    /// Wire an `EventLog` over an already-constructed `RecordStore`.
    pub async fn from_store(store: Arc<dyn RecordStore>, config: Config) -> RblogsResult<Self> {
        if store.get_metadata("schema_version").await?.is_none() {
            store
                .set_metadata("schema_version", &config.schema_version.to_string())
                .await?;
        }

        let engine = Arc::new(Engine::new(
            store.clone(),
            config.id_generator.clone(),
            config.state_reducer.clone(),
            config.snapshot_interval,
        ));

        Ok(Self {
            store,
            engine,
            max_events_per_query: config.max_events_per_query,
        })
    }

    /// Append a new event to its space's hash chain (spec.md §4.4).
    pub async fn write_event(&self, input: EventInput) -> RblogsResult<Event> {
        self.engine.write_event(input).await
    }

    /// Page through one space's events (spec.md §4.5).
    pub async fn query_by_space(&self, space_id: &str, opts: QueryOptions) -> RblogsResult<PaginatedResult<Event>> {
        let opts = self.clamp(opts);
        self.engine.query_by_space(space_id, &opts).await
    }

    /// Page through every event of `event_type`, across all spaces.
    pub async fn query_by_type(&self, event_type: EventType, opts: QueryOptions) -> RblogsResult<PaginatedResult<Event>> {
        let opts = self.clamp(opts);
        self.engine.query_by_type(event_type, &opts).await
    }

    /// Page through every event with `timestamp` in `[from, to)`.
    pub async fn query_by_time(&self, from: &str, to: &str, opts: QueryOptions) -> RblogsResult<PaginatedResult<Event>> {
        let opts = self.clamp(opts);
        self.engine.query_by_time(from, to, &opts).await
    }

    /// Rebuild a space's reducer-folded state as of `at_timestamp`, or its
    /// latest state if `None` (spec.md §4.8).
    pub async fn reconstruct_state(&self, space_id: &str, at_timestamp: Option<&str>) -> RblogsResult<serde_json::Value> {
        self.engine.reconstruct_state(space_id, at_timestamp).await
    }

    /// Verify one space's (or, if `None`, every space's) hash chain
    /// (spec.md §4.6).
    pub async fn verify_integrity(&self, space_id: Option<&str>) -> RblogsResult<IntegrityReport> {
        let verifier = IntegrityVerifier::new(self.store.as_ref());
        verifier.verify_integrity(space_id).await
    }

    /// Checkpoint a space's current reducer state (spec.md §4.7).
    pub async fn create_snapshot(&self, space_id: &str) -> RblogsResult<Snapshot> {
        self.engine.create_snapshot(space_id).await
    }

    /// Snapshot a space and report the events it now makes redundant for
    /// replay (spec.md §4.14).
    pub async fn compact(&self, space_id: &str) -> RblogsResult<CompactionReport> {
        self.engine.compact(space_id).await
    }

    /// Tally event/snapshot counts and estimated bytes, overall and per
    /// space (spec.md §4.12).
    pub async fn get_storage_usage(&self) -> RblogsResult<StorageReport> {
        self.engine.get_storage_usage().await
    }

    /// Classify storage pressure against an external byte budget
    /// (spec.md §4.13). Pure — does not re-query the store.
    pub fn classify_pressure(&self, report: &StorageReport, available_bytes: i64) -> PressureReport {
        rblogs_engine::classify_pressure(report, available_bytes)
    }

    /// Export a space's events before `before_date` as a `.rblogs` archive
    /// (spec.md §4.10).
    pub async fn export_archive(&self, space_id: &str, before_date: &str) -> RblogsResult<Vec<u8>> {
        export_archive(self.store.as_ref(), space_id, before_date).await
    }

    /// Import a `.rblogs` archive, deduplicating by event id (spec.md §4.11).
    pub async fn import_archive(&self, bytes: &[u8]) -> RblogsResult<ImportReport> {
        import_archive(self.store.as_ref(), bytes).await
    }

    /// Rebuild a space's AST-diffed source as of `at_timestamp`, or its
    /// latest source if `None` (spec.md §4.15).
    pub async fn reconstruct_source(&self, space_id: &str, at_timestamp: Option<&str>) -> RblogsResult<ReconstructedSource> {
        reconstruct_source(self.store.as_ref(), space_id, at_timestamp).await
    }

    /// The default sort order queries resolve to when a caller doesn't
    /// specify one. Exposed for callers that want to echo it back in a UI.
    pub fn default_order() -> Order {
        Order::default()
    }

    fn clamp(&self, mut opts: QueryOptions) -> QueryOptions {
        opts.limit = Some(opts.clamped_limit(self.max_events_per_query));
        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rblogs_contracts::event::Payload;

    async fn open_temp() -> EventLog {
        let dir = tempfile::tempdir().unwrap();
        EventLog::open(dir.path().join("db"), Config::default()).await.unwrap()
    }

    #[tokio::test]
    async fn write_then_query_round_trips() {
        let log = open_temp().await;
        let input = EventInput {
            event_type: EventType::SystemEvent,
            space_id: "s".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            version: 1,
            payload: Payload::new(),
        };
        let written = log.write_event(input).await.unwrap();
        assert_eq!(written.sequence_number, 1);

        let page = log.query_by_space("s", QueryOptions::default()).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, written.id);
    }

    #[tokio::test]
    async fn max_events_per_query_tightens_the_default_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            max_events_per_query: 2,
            ..Config::default()
        };
        let log = EventLog::open(dir.path().join("db"), config).await.unwrap();
        for i in 0..5 {
            let mut payload = Payload::new();
            payload.insert("i".to_string(), serde_json::json!(i));
            log.write_event(EventInput {
                event_type: EventType::SystemEvent,
                space_id: "s".to_string(),
                timestamp: format!("2026-01-01T00:0{i}:00Z"),
                version: 1,
                payload,
            })
            .await
            .unwrap();
        }

        let page = log
            .query_by_space("s", QueryOptions { limit: Some(1000), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn verify_integrity_passes_on_a_fresh_log() {
        let log = open_temp().await;
        let report = log.verify_integrity(None).await.unwrap();
        assert!(report.valid);
    }

    #[tokio::test]
    async fn export_then_import_round_trips() {
        let log = open_temp().await;
        log.write_event(EventInput {
            event_type: EventType::SystemEvent,
            space_id: "s".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            version: 1,
            payload: Payload::new(),
        })
        .await
        .unwrap();

        let archive = log.export_archive("s", "2026-01-02T00:00:00Z").await.unwrap();

        let log2 = open_temp().await;
        let report = log2.import_archive(&archive).await.unwrap();
        assert_eq!(report.imported_events, 1);
    }
}

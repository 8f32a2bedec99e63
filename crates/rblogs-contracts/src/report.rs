//! Report types returned by the integrity verifier, snapshot/compaction
//! manager, storage accounting, the pressure classifier, and the archive
//! importer.

use serde::{Deserialize, Serialize};

/// What the integrity verifier found at the first broken link, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokenLink {
    pub event_id: String,
    pub expected: String,
    pub actual: String,
}

/// Result of `verify_integrity` for one space, or the full database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub spaces_checked: Vec<String>,
    pub events_checked: u64,
    pub first_broken_link: Option<BrokenLink>,
    pub elapsed_ms: u64,
}

/// Per-space byte tally contributing to a `StorageReport`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceUsage {
    pub space_id: String,
    pub event_count: u64,
    pub estimated_bytes: u64,
}

/// Result of `get_storage_usage` (C12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageReport {
    pub total_events: u64,
    pub total_snapshots: u64,
    pub estimated_bytes: u64,
    pub per_space: Vec<SpaceUsage>,
    pub earliest_timestamp: Option<String>,
    pub latest_timestamp: Option<String>,
}

/// One of five threshold classifications of storage consumption (C13).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PressureLevel {
    Normal,
    Compact,
    ExportPrompt,
    Aggressive,
    Blocked,
}

/// Output of the pure pressure-classification function (C13).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureReport {
    pub level: PressureLevel,
    pub usage_ratio: f64,
    pub recommendation: String,
}

/// Result of `compact` (C14) — wraps a newly created snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionReport {
    pub space_id: String,
    pub snapshot_id: String,
    pub events_covered: u64,
    pub estimated_bytes_saved: u64,
}

/// One per-event failure recorded by the archive importer (C11) for an
/// entry that failed shape validation and was not inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEventError {
    pub event_id: String,
    pub reason: String,
}

/// Result of `import_archive` (C11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported_events: u64,
    pub skipped_duplicates: u64,
    pub errors: Vec<ImportEventError>,
}

/// Result of `reconstruct_source` (C15) — the source state rebuilt by
/// replaying a space's `space_evolved` AST diffs from its genesis
/// `space_created` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructedSource {
    pub space_id: String,
    pub as_of_timestamp: Option<String>,
    pub source: serde_json::Value,
    pub steps_applied: u64,
}

//! Runtime error types for the RBLOGS event log.
//!
//! All fallible operations across the RBLOGS crates return `RblogsResult<T>`.
//! Error variants carry enough context for a caller to act on them without
//! re-deriving it from the operation's inputs.

use thiserror::Error;

/// The unified error type for the RBLOGS event log.
#[derive(Debug, Error)]
pub enum RblogsError {
    /// The hash chain or a stored hash does not match what was recomputed.
    ///
    /// Raised by the integrity verifier, the archive exporter (pre-export
    /// chain check), and the archive importer (post-decode chain check).
    #[error("integrity violation for event '{event_id}': expected {expected}, got {actual}")]
    IntegrityViolation {
        event_id: String,
        expected: String,
        actual: String,
    },

    /// Reserved for callers that wrap the core with a storage budget check.
    #[error("storage full: used {used} of {max} bytes")]
    StorageFull { used: u64, max: u64 },

    /// A query input was malformed: a bad cursor, an out-of-range timestamp,
    /// an unparseable date, or similar.
    #[error("invalid query field '{field}': {reason}")]
    InvalidQuery { field: String, reason: String },

    /// Write-input validation failed, or diff-source reconstruction
    /// encountered a malformed payload.
    #[error("invalid event field '{field}': {reason}")]
    InvalidEvent { field: String, reason: String },

    /// `create_snapshot` could not produce a snapshot for the given reason
    /// (no events yet, or already compacted to the latest event).
    #[error("snapshot failed for space '{space_id}': {reason}")]
    SnapshotFailed { space_id: String, reason: String },

    /// An archive codec or chain-verification failure occurred during
    /// import; no events from the archive were inserted.
    #[error("import failed: {reason}")]
    ImportFailed {
        reason: String,
        event_id: Option<String>,
    },

    /// The underlying record store reported a fault.
    #[error("database error during '{operation}': {reason}")]
    DatabaseError { operation: String, reason: String },
}

/// Convenience alias used throughout the RBLOGS crates.
pub type RblogsResult<T> = Result<T, RblogsError>;

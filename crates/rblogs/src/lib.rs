//! # rblogs
//!
//! An embedded, append-only event log with cryptographic hash-chain
//! integrity, temporal queries, snapshot-based state reconstruction, and a
//! binary `.rblogs` archive format.
//!
//! [`EventLog`] is the single entry point: it wires a `sled`-backed
//! `RecordStore` (or any caller-supplied one) to the write pipeline, query
//! engine, integrity verifier, and archive codec behind the operations
//! described in spec.md §6. [`Config`] resolves the seven options in §6's
//! configuration table, loadable from TOML.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use rblogs::{Config, EventLog};
//! use rblogs_contracts::event::{EventInput, EventType, Payload};
//!
//! let log = EventLog::open("./data/events.rblogs.db", Config::default()).await?;
//! let event = log
//!     .write_event(EventInput {
//!         event_type: EventType::SystemEvent,
//!         space_id: "space-a".to_string(),
//!         timestamp: "2026-01-01T00:00:00Z".to_string(),
//!         version: 1,
//!         payload: Payload::new(),
//!     })
//!     .await?;
//! ```

mod config;
mod event_log;

pub use config::Config;
pub use event_log::EventLog;

pub use rblogs_contracts::error::{RblogsError, RblogsResult};
pub use rblogs_contracts::event::{Event, EventInput, EventType, Payload};
pub use rblogs_contracts::query::{CursorPosition, Order, PaginatedResult, QueryOptions};
pub use rblogs_contracts::report::{
    CompactionReport, ImportReport, IntegrityReport, PressureLevel, PressureReport, ReconstructedSource, StorageReport,
};
pub use rblogs_contracts::snapshot::Snapshot;

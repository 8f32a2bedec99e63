//! # rblogs-engine
//!
//! The write pipeline, query engine, snapshot manager, state reconstructor,
//! storage accounting, pressure classifier, and compaction for the RBLOGS
//! event log, all built around the single [`Engine`] type and the
//! `RecordStore` seam from `rblogs-core`.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rblogs_engine::Engine;
//!
//! let engine = Arc::new(Engine::new(store, id_generator, state_reducer, 1000));
//! let event = engine.write_event(input).await?;
//! ```

mod accounting;
mod compaction;
mod engine;
mod locks;
mod pressure;
mod query;
mod reconstruct;
mod snapshot;
mod write;

pub use engine::Engine;
pub use pressure::classify_pressure;

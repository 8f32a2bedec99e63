//! # rblogs-store
//!
//! `sled`-backed implementation of `rblogs_core::RecordStore`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rblogs_store::SledStore;
//! use rblogs_core::RecordStore;
//!
//! let store = SledStore::open("./data/events.rblogs.db")?;
//! store.insert_event(&event).await?;
//! ```

mod keys;
mod sled_store;

pub use sled_store::SledStore;

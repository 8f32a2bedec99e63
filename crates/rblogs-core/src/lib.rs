//! # rblogs-core
//!
//! Canonical serialization, event hashing, and chain linking — the pure
//! primitives the rest of the event log is built on — plus the
//! `RecordStore` trait boundary that `rblogs-store` implements and
//! `rblogs-engine`/`rblogs-verify`/`rblogs-archive` consume.
//!
//! Nothing in this crate touches an actual database or does I/O of its own;
//! `canon` and `chain` are pure functions over values already in hand, and
//! `traits` only declares the seam.

pub mod canon;
pub mod chain;
pub mod traits;

pub use canon::{canonical_bytes, canonical_hash};
pub use chain::{next_link, verify_chain_links, ChainLink};
pub use traits::{IdGenerator, RecordStore, StateReducer};

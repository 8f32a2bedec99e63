//! The `Engine` type: the write pipeline, query engine, snapshot manager,
//! state reconstructor, storage accounting, and compaction all operate as
//! `impl Engine` blocks in sibling modules, sharing the fields defined here.

use std::sync::Arc;

use rblogs_core::{IdGenerator, RecordStore, StateReducer};

use crate::locks::SpaceLocks;

/// Wires a `RecordStore` to the caller-supplied id generator and state
/// reducer, and owns the per-space write-serialization lock table.
///
/// `snapshot_interval` is the number of new events in a space that
/// triggers an automatic background snapshot after a write (spec.md
/// §4.4's "auto-snapshot" hook); `Config` in the `rblogs` facade resolves
/// this from TOML before constructing an `Engine`.
pub struct Engine {
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) locks: SpaceLocks,
    pub(crate) id_generator: Arc<IdGenerator>,
    pub(crate) state_reducer: Arc<StateReducer>,
    pub(crate) snapshot_interval: u64,
}

impl Engine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        id_generator: Arc<IdGenerator>,
        state_reducer: Arc<StateReducer>,
        snapshot_interval: u64,
    ) -> Self {
        Self {
            store,
            locks: SpaceLocks::new(),
            id_generator,
            state_reducer,
            snapshot_interval,
        }
    }
}

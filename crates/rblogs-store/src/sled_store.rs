//! `SledStore`: the `RecordStore` implementation backing the event log with
//! an embedded `sled` database.
//!
//! One tree holds each primary table (`events`, `snapshots`, `metadata`);
//! one tree holds each secondary index the design calls for. Every index
//! key is built so a plain lexicographic range scan gives the ordering the
//! caller asked for — see `crate::keys`.

use std::path::Path;

use rblogs_contracts::{
    error::{RblogsError, RblogsResult},
    event::{Event, EventType},
    query::Order,
    snapshot::Snapshot,
};
use rblogs_core::traits::RecordStore;
use sled::Db;
use tracing::debug;

use crate::keys::{prefix_upper_bound, space_prefix, space_seq_key, time_key, type_key};

fn db_err(operation: &str, reason: impl std::fmt::Display) -> RblogsError {
    RblogsError::DatabaseError {
        operation: operation.to_string(),
        reason: reason.to_string(),
    }
}

/// A persistent record store backed by a `sled` database.
pub struct SledStore {
    _db: Db, // kept alive so its trees remain valid for the store's lifetime
    events: sled::Tree,
    idx_event_space_seq: sled::Tree,
    idx_event_type: sled::Tree,
    idx_event_time: sled::Tree,
    spaces: sled::Tree,
    snapshots: sled::Tree,
    idx_snapshot_space_seq: sled::Tree,
    metadata: sled::Tree,
}

impl SledStore {
    /// Open or create a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> RblogsResult<Self> {
        let db = sled::Config::new()
            .path(path)
            .open()
            .map_err(|e| db_err("open", e))?;
        Self::from_db(db)
    }

    /// Build a store from an already-opened database.
    pub fn from_db(db: Db) -> RblogsResult<Self> {
        let events = db.open_tree("events").map_err(|e| db_err("open", e))?;
        let idx_event_space_seq = db
            .open_tree("idx_event_space_seq")
            .map_err(|e| db_err("open", e))?;
        let idx_event_type = db
            .open_tree("idx_event_type")
            .map_err(|e| db_err("open", e))?;
        let idx_event_time = db
            .open_tree("idx_event_time")
            .map_err(|e| db_err("open", e))?;
        let spaces = db.open_tree("spaces").map_err(|e| db_err("open", e))?;
        let snapshots = db.open_tree("snapshots").map_err(|e| db_err("open", e))?;
        let idx_snapshot_space_seq = db
            .open_tree("idx_snapshot_space_seq")
            .map_err(|e| db_err("open", e))?;
        let metadata = db.open_tree("metadata").map_err(|e| db_err("open", e))?;

        Ok(Self {
            _db: db,
            events,
            idx_event_space_seq,
            idx_event_type,
            idx_event_time,
            spaces,
            snapshots,
            idx_snapshot_space_seq,
            metadata,
        })
    }

    /// A temporary, on-disk-but-deleted-on-drop store for tests.
    #[cfg(test)]
    pub fn temporary() -> RblogsResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| db_err("open", e))?;
        Self::from_db(db)
    }

    fn load_event_by_id_bytes(&self, id_bytes: &[u8]) -> RblogsResult<Event> {
        let id = String::from_utf8_lossy(id_bytes).to_string();
        self.get_event_sync(&id)?.ok_or_else(|| {
            db_err(
                "load_event",
                format!("index referenced missing event '{id}'"),
            )
        })
    }

    fn get_event_sync(&self, id: &str) -> RblogsResult<Option<Event>> {
        match self.events.get(id.as_bytes()).map_err(|e| db_err("get_event", e))? {
            Some(bytes) => {
                let event = rmp_serde::from_slice(&bytes).map_err(|e| db_err("get_event", e))?;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    fn load_snapshot_by_id_bytes(&self, id_bytes: &[u8]) -> RblogsResult<Snapshot> {
        let id = String::from_utf8_lossy(id_bytes).to_string();
        match self.snapshots.get(id.as_bytes()).map_err(|e| db_err("get_snapshot", e))? {
            Some(bytes) => rmp_serde::from_slice(&bytes).map_err(|e| db_err("get_snapshot", e)),
            None => Err(db_err(
                "load_snapshot",
                format!("index referenced missing snapshot '{id}'"),
            )),
        }
    }

    fn timestamp_from_time_key(key: &[u8]) -> String {
        let sep = key.iter().position(|&b| b == 0).unwrap_or(key.len());
        String::from_utf8_lossy(&key[..sep]).to_string()
    }
}

#[async_trait::async_trait]
impl RecordStore for SledStore {
    async fn insert_event(&self, event: &Event) -> RblogsResult<()> {
        let bytes = rmp_serde::to_vec_named(event).map_err(|e| db_err("insert_event", e))?;
        let cas = self
            .events
            .compare_and_swap(event.id.as_bytes(), None::<&[u8]>, Some(bytes.as_slice()))
            .map_err(|e| db_err("insert_event", e))?;
        if cas.is_err() {
            return Err(db_err(
                "insert_event",
                format!("duplicate event id '{}'", event.id),
            ));
        }

        self.idx_event_space_seq
            .insert(
                space_seq_key(&event.space_id, event.sequence_number),
                event.id.as_bytes(),
            )
            .map_err(|e| db_err("insert_event", e))?;
        self.idx_event_type
            .insert(type_key(event.event_type.as_str(), &event.id), event.id.as_bytes())
            .map_err(|e| db_err("insert_event", e))?;
        self.idx_event_time
            .insert(time_key(&event.timestamp, &event.id), event.id.as_bytes())
            .map_err(|e| db_err("insert_event", e))?;
        self.spaces
            .insert(event.space_id.as_bytes(), &[] as &[u8])
            .map_err(|e| db_err("insert_event", e))?;

        debug!(event_id = %event.id, space_id = %event.space_id, seq = event.sequence_number, "event inserted");
        Ok(())
    }

    async fn get_event(&self, id: &str) -> RblogsResult<Option<Event>> {
        self.get_event_sync(id)
    }

    async fn latest_event_in_space(&self, space_id: &str) -> RblogsResult<Option<Event>> {
        let prefix = space_prefix(space_id);
        let upper = prefix_upper_bound(&prefix).unwrap_or_else(|| vec![0xFF; prefix.len() + 1]);
        let mut iter = self.idx_event_space_seq.range(prefix..upper);
        match iter.next_back() {
            Some(entry) => {
                let (_, id_bytes) = entry.map_err(|e| db_err("latest_event_in_space", e))?;
                Ok(Some(self.load_event_by_id_bytes(&id_bytes)?))
            }
            None => Ok(None),
        }
    }

    async fn count_events_in_space(&self, space_id: &str) -> RblogsResult<u64> {
        let prefix = space_prefix(space_id);
        Ok(self.idx_event_space_seq.scan_prefix(prefix).count() as u64)
    }

    async fn scan_events_by_space(
        &self,
        space_id: &str,
        cursor_seq: Option<u64>,
        order: Order,
        limit: usize,
    ) -> RblogsResult<Vec<Event>> {
        let prefix = space_prefix(space_id);
        let whole_upper = prefix_upper_bound(&prefix).unwrap_or_else(|| vec![0xFF; prefix.len() + 1]);

        let mut ids: Vec<sled::IVec> = Vec::new();
        match order {
            Order::Asc => {
                let lower = match cursor_seq {
                    Some(s) => space_seq_key(space_id, s + 1),
                    None => space_seq_key(space_id, 0),
                };
                for entry in self.idx_event_space_seq.range(lower..whole_upper) {
                    let (_, id_bytes) = entry.map_err(|e| db_err("scan_events_by_space", e))?;
                    ids.push(id_bytes);
                    if ids.len() >= limit {
                        break;
                    }
                }
            }
            Order::Desc => {
                let upper = match cursor_seq {
                    Some(s) => space_seq_key(space_id, s),
                    None => whole_upper,
                };
                let lower = space_seq_key(space_id, 0);
                for entry in self.idx_event_space_seq.range(lower..upper).rev() {
                    let (_, id_bytes) = entry.map_err(|e| db_err("scan_events_by_space", e))?;
                    ids.push(id_bytes);
                    if ids.len() >= limit {
                        break;
                    }
                }
            }
        }

        ids.iter().map(|id| self.load_event_by_id_bytes(id)).collect()
    }

    async fn scan_events_by_type(&self, event_type: EventType) -> RblogsResult<Vec<Event>> {
        let prefix = type_key(event_type.as_str(), "");
        self.idx_event_type
            .scan_prefix(prefix)
            .map(|entry| {
                let (_, id_bytes) = entry.map_err(|e| db_err("scan_events_by_type", e))?;
                self.load_event_by_id_bytes(&id_bytes)
            })
            .collect()
    }

    async fn count_events_by_type(&self, event_type: EventType) -> RblogsResult<u64> {
        let prefix = type_key(event_type.as_str(), "");
        Ok(self.idx_event_type.scan_prefix(prefix).count() as u64)
    }

    async fn scan_events_by_time(&self, from: &str, to: &str) -> RblogsResult<Vec<Event>> {
        self.idx_event_time
            .range(from.as_bytes().to_vec()..to.as_bytes().to_vec())
            .map(|entry| {
                let (_, id_bytes) = entry.map_err(|e| db_err("scan_events_by_time", e))?;
                self.load_event_by_id_bytes(&id_bytes)
            })
            .collect()
    }

    async fn count_events_by_time(&self, from: &str, to: &str) -> RblogsResult<u64> {
        Ok(self
            .idx_event_time
            .range(from.as_bytes().to_vec()..to.as_bytes().to_vec())
            .count() as u64)
    }

    async fn distinct_space_ids(&self) -> RblogsResult<Vec<String>> {
        self.spaces
            .iter()
            .keys()
            .map(|key| {
                let key = key.map_err(|e| db_err("distinct_space_ids", e))?;
                Ok(String::from_utf8_lossy(&key).to_string())
            })
            .collect()
    }

    async fn insert_snapshot(&self, snapshot: &Snapshot) -> RblogsResult<()> {
        let bytes = rmp_serde::to_vec_named(snapshot).map_err(|e| db_err("insert_snapshot", e))?;
        let cas = self
            .snapshots
            .compare_and_swap(snapshot.id.as_bytes(), None::<&[u8]>, Some(bytes.as_slice()))
            .map_err(|e| db_err("insert_snapshot", e))?;
        if cas.is_err() {
            return Err(db_err(
                "insert_snapshot",
                format!("duplicate snapshot id '{}'", snapshot.id),
            ));
        }
        self.idx_snapshot_space_seq
            .insert(
                space_seq_key(&snapshot.space_id, snapshot.event_sequence_number),
                snapshot.id.as_bytes(),
            )
            .map_err(|e| db_err("insert_snapshot", e))?;

        debug!(snapshot_id = %snapshot.id, space_id = %snapshot.space_id, "snapshot inserted");
        Ok(())
    }

    async fn latest_snapshot_for_space(&self, space_id: &str) -> RblogsResult<Option<Snapshot>> {
        let prefix = space_prefix(space_id);
        let upper = prefix_upper_bound(&prefix).unwrap_or_else(|| vec![0xFF; prefix.len() + 1]);
        let mut iter = self.idx_snapshot_space_seq.range(prefix..upper);
        match iter.next_back() {
            Some(entry) => {
                let (_, id_bytes) = entry.map_err(|e| db_err("latest_snapshot_for_space", e))?;
                Ok(Some(self.load_snapshot_by_id_bytes(&id_bytes)?))
            }
            None => Ok(None),
        }
    }

    async fn scan_snapshots_by_space(&self, space_id: &str) -> RblogsResult<Vec<Snapshot>> {
        let prefix = space_prefix(space_id);
        let upper = prefix_upper_bound(&prefix).unwrap_or_else(|| vec![0xFF; prefix.len() + 1]);
        self.idx_snapshot_space_seq
            .range(prefix..upper)
            .map(|entry| {
                let (_, id_bytes) = entry.map_err(|e| db_err("scan_snapshots_by_space", e))?;
                self.load_snapshot_by_id_bytes(&id_bytes)
            })
            .collect()
    }

    async fn total_event_count(&self) -> RblogsResult<u64> {
        Ok(self.events.len() as u64)
    }

    async fn total_snapshot_count(&self) -> RblogsResult<u64> {
        Ok(self.snapshots.len() as u64)
    }

    async fn earliest_and_latest_timestamp(&self) -> RblogsResult<(Option<String>, Option<String>)> {
        let earliest = self
            .idx_event_time
            .first()
            .map_err(|e| db_err("earliest_and_latest_timestamp", e))?
            .map(|(key, _)| Self::timestamp_from_time_key(&key));
        let latest = self
            .idx_event_time
            .last()
            .map_err(|e| db_err("earliest_and_latest_timestamp", e))?
            .map(|(key, _)| Self::timestamp_from_time_key(&key));
        Ok((earliest, latest))
    }

    async fn get_metadata(&self, key: &str) -> RblogsResult<Option<String>> {
        match self.metadata.get(key.as_bytes()).map_err(|e| db_err("get_metadata", e))? {
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).to_string())),
            None => Ok(None),
        }
    }

    async fn set_metadata(&self, key: &str, value: &str) -> RblogsResult<()> {
        self.metadata
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| db_err("set_metadata", e))?;
        Ok(())
    }
}

//! Configuration: the seven options from spec.md §6.
//!
//! `database_name`, `schema_version`, `max_events_per_query`,
//! `snapshot_interval`, and `hash_algorithm` are plain scalars and load
//! from TOML the way `TomlPolicyEngine::from_toml_str` does. `state_reducer`
//! and `id_generator` are caller-supplied callables — they cannot round-trip
//! through TOML, so they default to spec.md's own defaults and are only
//! overridden programmatically via `with_state_reducer`/`with_id_generator`.

use std::path::Path;
use std::sync::Arc;

use rblogs_contracts::error::{RblogsError, RblogsResult};
use rblogs_core::{IdGenerator, StateReducer};
use serde::Deserialize;
use uuid::Uuid;

/// The only hash algorithm `rblogs` currently supports. `Config::hash_algorithm`
/// is validated against this rather than plumbed anywhere near `rblogs-core`'s
/// canonical hasher, which is hardwired to SHA-256 regardless.
const SUPPORTED_HASH_ALGORITHM: &str = "SHA-256";

/// Resolved configuration for an `EventLog`.
///
/// The scalar fields load from TOML via [`Config::from_toml_str`] or
/// [`Config::from_file`]; `state_reducer` and `id_generator` are plain
/// Rust closures, set through the builder methods.
pub struct Config {
    pub database_name: String,
    pub schema_version: u32,
    pub max_events_per_query: u32,
    pub snapshot_interval: u64,
    pub hash_algorithm: String,
    pub state_reducer: Arc<StateReducer>,
    pub id_generator: Arc<IdGenerator>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_name: "event-log".to_string(),
            schema_version: 1,
            max_events_per_query: 1000,
            snapshot_interval: 100,
            hash_algorithm: SUPPORTED_HASH_ALGORITHM.to_string(),
            state_reducer: Arc::new(default_state_reducer),
            id_generator: Arc::new(default_id_generator),
        }
    }
}

/// Last-write-wins: the next state is simply the new event's payload.
fn default_state_reducer(_prior: Option<&serde_json::Value>, event: &rblogs_contracts::event::Event) -> serde_json::Value {
    serde_json::Value::Object(event.payload.clone().into_iter().collect())
}

/// UUID v4, via the same cryptographic RNG `uuid`'s `new_v4` already wraps.
fn default_id_generator() -> String {
    Uuid::new_v4().to_string()
}

/// The TOML-serializable subset of `Config` — everything except the two
/// callables, which TOML has no way to express.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
struct TomlConfig {
    database_name: Option<String>,
    schema_version: Option<u32>,
    max_events_per_query: Option<u32>,
    snapshot_interval: Option<u64>,
    hash_algorithm: Option<String>,
}

impl Config {
    /// Parse a TOML document, overlaying its fields onto the defaults.
    /// `state_reducer`/`id_generator` are always the defaults after this
    /// call — use the builder methods to override them.
    pub fn from_toml_str(toml_str: &str) -> RblogsResult<Self> {
        let parsed: TomlConfig = toml::from_str(toml_str).map_err(|e| RblogsError::DatabaseError {
            operation: "config".to_string(),
            reason: format!("failed to parse configuration TOML: {e}"),
        })?;
        Self::from_parsed(parsed)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> RblogsResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| RblogsError::DatabaseError {
            operation: "config".to_string(),
            reason: format!("failed to read configuration file '{}': {e}", path.as_ref().display()),
        })?;
        Self::from_toml_str(&contents)
    }

    fn from_parsed(parsed: TomlConfig) -> RblogsResult<Self> {
        let mut config = Config::default();
        if let Some(v) = parsed.database_name {
            config.database_name = v;
        }
        if let Some(v) = parsed.schema_version {
            config.schema_version = v;
        }
        if let Some(v) = parsed.max_events_per_query {
            config.max_events_per_query = v;
        }
        if let Some(v) = parsed.snapshot_interval {
            config.snapshot_interval = v;
        }
        if let Some(v) = parsed.hash_algorithm {
            if v != SUPPORTED_HASH_ALGORITHM {
                return Err(RblogsError::DatabaseError {
                    operation: "config".to_string(),
                    reason: format!("unsupported hash_algorithm '{v}': only '{SUPPORTED_HASH_ALGORITHM}' is permitted"),
                });
            }
            config.hash_algorithm = v;
        }
        Ok(config)
    }

    /// Override the default last-write-wins reducer.
    pub fn with_state_reducer(mut self, reducer: StateReducer) -> Self {
        self.state_reducer = Arc::new(reducer);
        self
    }

    /// Override the default UUID v4 id generator.
    pub fn with_id_generator(mut self, generator: IdGenerator) -> Self {
        self.id_generator = Arc::new(generator);
        self
    }
}

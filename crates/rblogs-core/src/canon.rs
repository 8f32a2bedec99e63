//! Canonical serialization and event hashing (C1).
//!
//! The canonical form depends only on the *value* of a JSON-compatible tree,
//! never on the map representation a caller happened to build it with:
//! object keys are sorted lexicographically by Unicode code point at every
//! nesting depth, arrays keep positional order, and scalars use standard
//! JSON encoding. This is computed explicitly — walking `serde_json::Value`
//! by hand — rather than leaning on `serde_json::Map`'s default key
//! ordering, since that ordering depends on whether the `preserve_order`
//! Cargo feature is active anywhere in the dependency graph.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize `value` to its canonical byte form.
///
/// `T` is first converted to a `serde_json::Value` (so any `Serialize` type
/// works, not just `Value` itself), then walked recursively with keys
/// sorted at every object depth.
pub fn canonical_bytes<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let v = serde_json::to_value(value)?;
    let mut out = Vec::new();
    write_canonical(&v, &mut out);
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_json_string(key, out);
                out.push(b':');
                write_canonical(&map[*key], out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        // Scalars have no ordering ambiguity; serde_json's own encoding is
        // already canonical for them (no insignificant whitespace, numbers
        // rendered without the map-ordering question).
        scalar => out.extend_from_slice(&serde_json::to_vec(scalar).expect("scalar value serializes")),
    }
}

fn write_json_string(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(&serde_json::to_vec(s).expect("string serializes"));
}

/// `SHA-256(canonical_serialize(value))`, returned as lowercase hex.
pub fn canonical_hash<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let bytes = canonical_bytes(value)?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode(digest))
}

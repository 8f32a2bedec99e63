//! Binary archive codec (C9): header + deflate-compressed body + SHA-256
//! footer, laid out exactly as spec.md §4.9 describes.
//!
//! ```text
//! offset 0   (5 bytes)  magic "RBLOG"
//! offset 5   (1 byte)   version (0x01)
//! offset 6   (4 bytes)  event count, big-endian u32
//! offset 10  (N bytes)  deflate-compressed body (RFC 1951)
//! offset 10+N (64 bytes) lowercase hex SHA-256 of the *uncompressed* body
//! ```
//!
//! The body is a JSON array of [`ArchiveRecord`]s in a fixed field order —
//! distinct from the sorted-key canonical form `rblogs-core` uses for
//! hashing, since this format only needs to be self-consistent, not
//! reproduce a specific hash.

use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};
use rblogs_contracts::{
    error::{RblogsError, RblogsResult},
    event::{Event, EventType, Payload},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};

pub const MAGIC: &[u8; 5] = b"RBLOG";
pub const VERSION: u8 = 1;
const HEADER_LEN: usize = 10;
const FOOTER_LEN: usize = 64;

/// One event as it appears in an archive body: the same data as `Event`,
/// field order fixed for a deterministic, readable encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub space_id: String,
    pub timestamp: String,
    pub sequence_number: u64,
    pub hash: String,
    pub previous_hash: Option<String>,
    pub version: u32,
    pub payload: Payload,
}

impl From<&Event> for ArchiveRecord {
    fn from(e: &Event) -> Self {
        ArchiveRecord {
            id: e.id.clone(),
            event_type: e.event_type,
            space_id: e.space_id.clone(),
            timestamp: e.timestamp.clone(),
            sequence_number: e.sequence_number,
            hash: e.hash.clone(),
            previous_hash: e.previous_hash.clone(),
            version: e.version,
            payload: e.payload.clone(),
        }
    }
}

impl From<ArchiveRecord> for Event {
    fn from(r: ArchiveRecord) -> Self {
        Event {
            id: r.id,
            event_type: r.event_type,
            space_id: r.space_id,
            timestamp: r.timestamp,
            sequence_number: r.sequence_number,
            hash: r.hash,
            previous_hash: r.previous_hash,
            version: r.version,
            payload: r.payload,
        }
    }
}

/// Encode `events` (already ordered and chain-validated by the caller)
/// into a complete `.rblogs` archive.
pub fn encode(events: &[Event]) -> RblogsResult<Vec<u8>> {
    let records: Vec<ArchiveRecord> = events.iter().map(ArchiveRecord::from).collect();
    let body = serde_json::to_vec(&records).map_err(|e| RblogsError::DatabaseError {
        operation: "encode_archive".to_string(),
        reason: e.to_string(),
    })?;

    let footer = hex::encode(Sha256::digest(&body));

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&body).map_err(|e| RblogsError::DatabaseError {
        operation: "encode_archive".to_string(),
        reason: e.to_string(),
    })?;
    let compressed = encoder.finish().map_err(|e| RblogsError::DatabaseError {
        operation: "encode_archive".to_string(),
        reason: e.to_string(),
    })?;

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len() + FOOTER_LEN);
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&(events.len() as u32).to_be_bytes());
    out.extend_from_slice(&compressed);
    out.extend_from_slice(footer.as_bytes());
    Ok(out)
}

/// The decompressed, hash-verified body of an archive, plus the event
/// count its header declared.
pub struct DecodedArchive {
    pub declared_count: u32,
    pub body: Vec<u8>,
}

/// Run the header/footer validation steps of spec.md §4.11 in order,
/// stopping at the first failure: length, magic, version, decompress,
/// footer hash. Does not touch the body's JSON contents.
pub fn decode(bytes: &[u8]) -> RblogsResult<DecodedArchive> {
    if bytes.len() < HEADER_LEN + FOOTER_LEN {
        return Err(RblogsError::ImportFailed {
            reason: "archive is shorter than the minimum header and footer length".to_string(),
            event_id: None,
        });
    }
    if &bytes[0..5] != MAGIC {
        return Err(RblogsError::ImportFailed {
            reason: "archive magic bytes do not match 'RBLOG'".to_string(),
            event_id: None,
        });
    }
    let version = bytes[5];
    if version != VERSION {
        return Err(RblogsError::ImportFailed {
            reason: format!("unsupported archive version {version}"),
            event_id: None,
        });
    }
    let declared_count = u32::from_be_bytes(bytes[6..10].try_into().expect("4-byte slice"));

    let footer_start = bytes.len() - FOOTER_LEN;
    let compressed = &bytes[HEADER_LEN..footer_start];
    let footer_hex = std::str::from_utf8(&bytes[footer_start..]).map_err(|_| {
        RblogsError::ImportFailed {
            reason: "archive footer is not valid UTF-8 hex".to_string(),
            event_id: None,
        }
    })?;

    let mut decoder = DeflateDecoder::new(compressed);
    let mut body = Vec::new();
    decoder.read_to_end(&mut body).map_err(|e| RblogsError::ImportFailed {
        reason: format!("failed to decompress archive body: {e}"),
        event_id: None,
    })?;

    let actual_hex = hex::encode(Sha256::digest(&body));
    if !actual_hex.eq_ignore_ascii_case(footer_hex) {
        return Err(RblogsError::ImportFailed {
            reason: "archive footer hash does not match the decompressed body".to_string(),
            event_id: None,
        });
    }

    Ok(DecodedArchive { declared_count, body })
}

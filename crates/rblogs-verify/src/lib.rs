//! # rblogs-verify
//!
//! Chain and hash integrity verification for the RBLOGS event log.
//!
//! [`engine::IntegrityVerifier`] walks a space's (or every space's) event
//! chain, checking `previous_hash` linkage and recomputed canonical hashes,
//! and reports the first violation found.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use rblogs_verify::engine::IntegrityVerifier;
//!
//! let verifier = IntegrityVerifier::new(&store);
//! let report = verifier.verify_integrity(Some("space-a")).await?;
//! ```

pub mod engine;

pub use engine::IntegrityVerifier;

//! # rblogs-archive
//!
//! The binary `.rblogs` archive codec, exporter, and importer, plus the
//! diff-based source reconstructor that replays `space_evolved` AST
//! diffs over a space's genesis source.

pub mod codec;
pub mod export;
pub mod import;
pub mod source;

pub use export::export_archive;
pub use import::import_archive;
pub use source::reconstruct_source;

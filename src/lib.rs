//! Static and dynamic string recovery for Windows PE binaries compiled from
//! languages that don't store their strings as ordinary C-style
//! null-terminated byte sequences.
//!
//! Two independent engines:
//!
//! - [`blob`]: recovers Rust/Go string-blob strings from a PE's read-only
//!   data section, using xref discovery ([`xrefs`]) and struct-candidate
//!   discovery ([`structs`]) to split an over-merged blob into individual
//!   strings.
//! - [`tightstrings`]: recovers strings a tight inner loop builds
//!   byte-by-byte on the stack, by driving an injected CPU emulator and
//!   diffing stack snapshots at loop entry and exit.
//!
//! Both lean on [`fp_filter`] to strip or reject known-noise candidates.
//! PE parsing, CPU emulation, and generic string scanning are treated as
//! external collaborators, exposed here only as the traits in [`pe`],
//! [`tightstrings`], and [`scanner`] that a caller's own implementations
//! plug into.

pub mod blob;
pub mod config;
pub mod error;
pub mod fp_filter;
pub mod model;
pub mod pe;
pub mod scanner;
pub mod structs;
pub mod tightstrings;
pub mod xrefs;

pub use config::{DriverLimits, EmulatorConfig, ExtractionConfig, Language};
pub use error::{Error, Result};
pub use model::{
    CallContext, Machine, SectionView, StaticString, StringEncoding, StructCandidate, TightString,
    Xref,
};

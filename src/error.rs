//! Crate-wide error type.
//!
//! Recoverable conditions (missing `.rdata`, unsupported machine type,
//! per-function emulation faults) are not represented here: those are
//! swallowed at the point of occurrence and turned into empty results plus a
//! log line, per the propagation policy of the components that produce them.
//! This type exists for the handful of things a caller truly cannot recover
//! from on its own.

use crate::model::Machine;

/// Errors surfaced across `floss_core`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The sample does not parse as a PE image.
    #[error("sample is not a valid PE image")]
    NotAPe,

    /// The image has no `.rdata` section.
    #[error("PE image has no .rdata section")]
    NoRdata,

    /// The image's machine type is neither 32- nor 64-bit x86.
    #[error("unsupported machine type: {0:?}")]
    UnsupportedMachine(Machine),

    /// Reading the emulator's stack memory failed.
    #[error("stack read failed: {0}")]
    StackRead(String),

    /// The emulator faulted while driving a function.
    #[error("emulator fault: {0}")]
    EmulatorFault(String),
}

/// Convenience alias matching the rest of the crate's `Result` usage.
pub type Result<T> = core::result::Result<T, Error>;

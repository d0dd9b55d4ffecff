//! Extraction-time tunables shared by the blob and tightstring engines.
//!
//! This crate takes no configuration file and has no CLI of its own (both
//! are the caller's concern); what little is tunable is grouped into one
//! `Copy` struct, the same way `m4b-goblin`'s `ParseOptions` groups its
//! parse-time knobs.

/// Language-specific layout hint for the struct-string harvester. Rust and
/// Go both describe strings as `{ ptr, len }` pairs with the same byte
/// layout; the only practical difference is the length range that counts as
/// plausible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
    Go,
}

impl Language {
    /// Upper bound on a plausible string length for this language's struct
    /// candidates. Go binaries commonly embed much longer string constants
    /// (panic messages, reflection type names) than Rust's.
    pub(crate) fn max_plausible_length(&self) -> u64 {
        match self {
            Language::Rust => 4096,
            Language::Go => 65536,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Rust
    }
}

/// Knobs shared across the blob and tightstring engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// Minimum accepted string length, post-filtering.
    pub min_length: usize,
    /// Language hint for the struct-string harvester.
    pub language: Language,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            min_length: 4,
            language: Language::Rust,
        }
    }
}

impl ExtractionConfig {
    pub fn new(min_length: usize) -> Self {
        ExtractionConfig {
            min_length,
            ..Default::default()
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }
}

/// Emulator configuration for one function's tightstring run (`spec.md`
/// §5). Owned for the duration of a single `tightstrings::extract` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulatorConfig {
    pub stack_size: usize,
    pub stack_pointer_offset_from_top: usize,
    pub rep_limit: u32,
    pub taint_byte: u8,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        const MEGABYTE: usize = 1024 * 1024;
        EmulatorConfig {
            stack_size: MEGABYTE / 2,
            stack_pointer_offset_from_top: MEGABYTE / 4,
            rep_limit: 256,
            taint_byte: 0xFE,
        }
    }
}

/// Limits passed to the `Driver` when running one function (`spec.md` §4.5,
/// §5: "bounded by `maxhit` and `maxrep`... to guarantee termination").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverLimits {
    pub max_hit: u32,
    pub max_rep: u32,
    pub func_only: bool,
}

impl Default for DriverLimits {
    fn default() -> Self {
        DriverLimits {
            max_hit: 256,
            max_rep: 256,
            func_only: true,
        }
    }
}

//! Core data types shared by every component: recovered strings, the
//! intermediate candidates that feed the blob engine, and the
//! emulator/section views the tightstring engine and blob engine read from.

/// How a recovered string's bytes were encoded in the sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringEncoding {
    Ascii,
    Utf8,
    Utf16Le,
}

/// A string recovered from the read-only data section by the blob engine
/// (or, in the case of `Ascii`/`Utf16Le`, by the external static-scan
/// collaborator that floss-core does not itself implement).
///
/// `offset` is a file-relative byte position. Instances are never mutated
/// after construction; the split operation in the blob engine retires one
/// instance and produces up to two new ones rather than editing in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticString {
    pub bytes: String,
    pub offset: u64,
    pub encoding: StringEncoding,
}

impl StaticString {
    pub fn new(bytes: impl Into<String>, offset: u64, encoding: StringEncoding) -> Self {
        StaticString {
            bytes: bytes.into(),
            offset,
            encoding,
        }
    }

    /// End of the string, exclusive, in the same file-offset space as `offset`.
    pub fn end_offset(&self) -> u64 {
        self.offset + self.bytes.len() as u64
    }
}

/// A string extracted from a tight-loop's stack snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TightString {
    pub function_va: u64,
    pub bytes: String,
    pub encoding: StringEncoding,
    /// VA at which the originating loop exits.
    pub program_counter: u64,
    pub stack_pointer: u64,
    pub initial_stack_pointer: u64,
    /// Offset of `bytes` within the captured stack buffer.
    pub stack_offset: u64,
    /// `(initial_stack_pointer - stack_pointer) - stack_offset - pointer_size`.
    pub frame_offset: i64,
}

impl TightString {
    pub fn frame_offset(
        initial_stack_pointer: u64,
        stack_pointer: u64,
        stack_offset: u64,
        pointer_size: u64,
    ) -> i64 {
        (initial_stack_pointer as i64 - stack_pointer as i64)
            - stack_offset as i64
            - pointer_size as i64
    }
}

/// A candidate (pointer, length) struct found in the read-only section.
/// Only the pointer's target VA is consumed downstream; the length is used
/// to decide plausibility and then dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructCandidate {
    pub address: u64,
}

/// A single code-to-data cross-reference discovered by the xref harvester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Xref {
    pub target_va: u64,
}

/// A snapshot of emulator state taken at a point of interest (entry or exit
/// of a tight loop). Lives only for the duration of one function's
/// emulation.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub program_counter: u64,
    pub stack_pointer: u64,
    pub initial_stack_pointer: u64,
    pub stack_memory: Vec<u8>,
}

/// Immutable view of a PE section's raw bytes and placement, as handed to
/// us by the injected `PeImage`. floss-core does not parse PE headers
/// itself; this is the shape the accessor is expected to hand back for
/// `.rdata`.
#[derive(Debug, Clone)]
pub struct SectionView {
    pub virtual_address: u64,
    pub pointer_to_raw_data: u64,
    pub size_of_raw_data: u64,
    pub raw_bytes: Vec<u8>,
}

impl SectionView {
    pub fn start(&self) -> u64 {
        self.pointer_to_raw_data
    }

    pub fn end(&self) -> u64 {
        self.pointer_to_raw_data + self.size_of_raw_data
    }

    /// Translate a virtual address to a file offset within this section,
    /// returning `None` if the VA does not land inside the section.
    pub fn va_to_file_offset(&self, va: u64, image_base: u64) -> Option<u64> {
        let rva = va.checked_sub(image_base)?;
        let section_rva = rva.checked_sub(self.virtual_address)?;
        if section_rva >= self.size_of_raw_data {
            return None;
        }
        Some(self.pointer_to_raw_data + section_rva)
    }
}

/// The subset of PE machine types the blob engine knows how to mine for
/// xrefs. `spec.md` describes this dispatch in prose ("32-bit PE" / "64-bit
/// PE" / "other"); its own Design Notes ask for a tagged variant instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Machine {
    X86,
    X64,
    Unsupported(u16),
}

impl Machine {
    pub const IMAGE_FILE_MACHINE_I386: u16 = 0x14c;
    pub const IMAGE_FILE_MACHINE_AMD64: u16 = 0x8664;

    pub fn from_raw(machine: u16) -> Self {
        match machine {
            Self::IMAGE_FILE_MACHINE_I386 => Machine::X86,
            Self::IMAGE_FILE_MACHINE_AMD64 => Machine::X64,
            other => Machine::Unsupported(other),
        }
    }

    /// Pointer size in bytes for this machine, used for `frame_offset` and
    /// for the struct-string harvester's candidate layout.
    pub fn pointer_size(&self) -> Option<u64> {
        match self {
            Machine::X86 => Some(4),
            Machine::X64 => Some(8),
            Machine::Unsupported(_) => None,
        }
    }
}

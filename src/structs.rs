//! Struct-string candidate discovery (`spec.md` §4.3).
//!
//! Rust's `&str`/`&[u8]` and Go's `string` header are both, at the ABI
//! level, a `{ ptr, len }` pair of pointer-sized fields. This scans the
//! read-only section for every aligned pointer-sized offset whose first
//! field looks like a VA inside the same section and whose second field
//! looks like a plausible length, using `scroll::Pread` the way
//! `m4b-goblin` reads every other structured field in a PE.

use scroll::{Pread, LE};

use crate::config::Language;
use crate::model::{Machine, SectionView, StructCandidate};

fn read_pointer(bytes: &[u8], offset: usize, pointer_size: u64) -> Option<u64> {
    if pointer_size == 8 {
        bytes.pread_with::<u64>(offset, LE).ok()
    } else {
        bytes.pread_with::<u32>(offset, LE).ok().map(u64::from)
    }
}

/// Scan `section` for plausible `(pointer, length)` struct candidates.
///
/// `image_base` and `section` together let us test whether the pointer
/// field's target VA falls inside the same section (the layout Rust/Go
/// string-blob descriptors use almost exclusively).
pub fn get_struct_string_candidates(
    machine: Machine,
    image_base: u64,
    section: &SectionView,
    language: Language,
) -> Vec<StructCandidate> {
    let Some(pointer_size) = machine.pointer_size() else {
        return Vec::new();
    };
    let pointer_size = pointer_size as usize;
    let bytes = &section.raw_bytes;
    if bytes.len() < pointer_size * 2 {
        return Vec::new();
    }

    let section_va_start = image_base + section.virtual_address;
    let section_va_end = section_va_start + section.size_of_raw_data;
    let max_length = language.max_plausible_length();

    let mut candidates = Vec::new();
    for offset in (0..=bytes.len() - pointer_size * 2).step_by(pointer_size) {
        let Some(ptr) = read_pointer(bytes, offset, pointer_size as u64) else {
            continue;
        };
        if ptr < section_va_start || ptr >= section_va_end {
            continue;
        }
        let Some(len) = read_pointer(bytes, offset + pointer_size, pointer_size as u64) else {
            continue;
        };
        if len == 0 || len > max_length {
            continue;
        }
        // the pointed-to range must itself fit inside the section
        let target_offset = ptr - section_va_start;
        if target_offset + len > section.size_of_raw_data {
            continue;
        }
        candidates.push(StructCandidate { address: ptr });
    }
    candidates
}

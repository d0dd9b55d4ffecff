//! The blob string engine (`spec.md` §4.4): extracts UTF-8 runs from the
//! read-only data section, repairs a known wide/UTF-8 misclassification,
//! and splits over-merged strings at xref boundaries.

use crate::config::ExtractionConfig;
use crate::model::{Machine, StaticString, StringEncoding};
use crate::pe::{get_rdata_section, utils::xref_file_offsets, PeImage};
use crate::scanner::{ScanEncoding, ScanResult, StringScanner};
use crate::structs::get_struct_string_candidates;
use crate::xrefs::find_xrefs;

/// Re-encode `text` as the scanner would have when it (possibly wrongly)
/// classified it `WIDE_STRING`, and return whether the first byte is zero
/// -- the tell that it's really a UTF-8 string starting one byte later
/// (`spec.md` §4.4 step 3; corrects a known upstream `b2s` bug).
fn looks_like_misclassified_utf8(text: &str) -> bool {
    text.encode_utf16()
        .next()
        .map(|unit| unit.to_le_bytes()[0] == 0)
        .unwrap_or(false)
}

/// Wide-string repair pass. Consumes `results` in order, holding at most one
/// pending fixup at a time; `WIDE_STRING` entries are never themselves
/// emitted, only used as evidence for a fixup on the next non-wide result.
fn fix_wide_strings(
    results: Vec<ScanResult>,
    min_length: usize,
    buffer: &[u8],
    scanner: &dyn StringScanner,
) -> Vec<ScanResult> {
    let mut fixed = Vec::with_capacity(results.len());
    let mut pending: Option<ScanResult> = None;

    for result in results {
        match result.encoding {
            ScanEncoding::WideString => {
                if looks_like_misclassified_utf8(&result.text) {
                    let rescan_from = result.start + 1;
                    pending = scanner
                        .scan_one(&buffer[rescan_from..])
                        .map(|mut candidate| {
                            candidate.start += rescan_from;
                            candidate.end += rescan_from;
                            candidate
                        })
                        .filter(|candidate| candidate.text.chars().count() >= min_length);
                }
                // if the re-encoding doesn't start with a zero byte, any
                // pending fixup from an earlier entry is left untouched,
                // matching the upstream control flow this repairs.
            }
            ScanEncoding::Utf8 => {
                match &pending {
                    Some(fixup) if fixup.text.contains(&result.text) => fixed.push(fixup.clone()),
                    _ => fixed.push(result),
                }
                pending = None;
            }
        }
    }
    fixed
}

/// Project surviving `UTF8` results into file-offset `StaticString`s,
/// stripping embedded newlines (`spec.md` §4.4 step 4).
fn project_utf8(results: Vec<ScanResult>, section_start: u64) -> Vec<StaticString> {
    results
        .into_iter()
        .filter(|r| r.encoding == ScanEncoding::Utf8)
        .map(|r| {
            let cleaned = r.text.replace('\n', "");
            StaticString::new(cleaned, section_start + r.start as u64, StringEncoding::Utf8)
        })
        .collect()
}

/// Split `s` at `file_offset` if it falls strictly inside `s`'s bytes,
/// keeping each half only if it still meets `min_length`. Returns the
/// replacement(s) for `s`, or `s` unchanged if the offset doesn't apply or
/// falls on a codepoint boundary we can't cleanly cut.
fn split_one(s: StaticString, file_offset: u64, min_length: usize) -> Vec<StaticString> {
    if !(s.offset < file_offset && file_offset < s.end_offset()) {
        return vec![s];
    }
    let split_point = (file_offset - s.offset) as usize;
    if !s.bytes.is_char_boundary(split_point) {
        return vec![s];
    }
    let (left, right) = s.bytes.split_at(split_point);
    let mut out = Vec::with_capacity(2);
    if left.chars().count() >= min_length {
        out.push(StaticString::new(left, s.offset, StringEncoding::Utf8));
    }
    if right.chars().count() >= min_length {
        out.push(StaticString::new(right, file_offset, StringEncoding::Utf8));
    }
    out
}

/// Apply one xref's split decision across the whole list. At most one
/// string is ever affected by a given offset, since strings never overlap.
/// Built as a fresh `Vec` each time rather than mutating in place while
/// iterating (`spec.md` §9, "Mutable list being iterated").
fn apply_split(strings: Vec<StaticString>, file_offset: u64, min_length: usize) -> Vec<StaticString> {
    let mut out = Vec::with_capacity(strings.len() + 1);
    let mut applied = false;
    for s in strings {
        if applied {
            out.push(s);
            continue;
        }
        let before = s.offset;
        let parts = split_one(s, file_offset, min_length);
        if parts.len() != 1 || parts.first().map(|p| p.offset) != Some(before) {
            applied = true;
        }
        out.extend(parts);
    }
    out
}

/// Extract `StaticString`s from `pe`'s `.rdata` section (`spec.md` §4.4).
pub fn extract_blob_strings(
    pe: &dyn PeImage,
    config: &ExtractionConfig,
    scanner: &dyn StringScanner,
) -> Vec<StaticString> {
    let machine = pe.machine();
    if let Machine::Unsupported(raw) = machine {
        log::warn!("unsupported machine type for blob string extraction: {raw:#x}");
        return Vec::new();
    }

    let Some(section) = get_rdata_section(pe) else {
        return Vec::new();
    };

    let raw_results = scanner.scan(&section.raw_bytes, config.min_length);
    let fixed = fix_wide_strings(raw_results, config.min_length, &section.raw_bytes, scanner);
    let mut strings = project_utf8(fixed, section.start());

    let image_base = pe.image_base();

    let struct_xrefs: Vec<_> = get_struct_string_candidates(machine, image_base, &section, config.language)
        .into_iter()
        .map(|c| crate::model::Xref { target_va: c.address })
        .collect();

    let instr_xrefs: Vec<_> = pe
        .executable_sections()
        .iter()
        .flat_map(|(base_va, code)| find_xrefs(machine, code, *base_va))
        .collect();

    let mut all_xrefs = struct_xrefs;
    all_xrefs.extend(instr_xrefs);
    let offsets = xref_file_offsets(&all_xrefs, &section, image_base);

    for offset in offsets {
        strings = apply_split(strings, offset, config.min_length);
    }

    strings
}

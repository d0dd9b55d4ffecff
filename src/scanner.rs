//! The injected printable-run string scanner (`spec.md` §6).
//!
//! floss-core treats "find all printable ASCII/UTF-16 runs in a buffer" as
//! an external black box (`spec.md` §1's Non-goals). This module only
//! defines the seam; `test_support::DefaultStringScanner` is a small,
//! deliberately unoptimized reference implementation used solely so this
//! crate's own tests can exercise the blob and tightstring pipelines
//! end-to-end without a production scanner wired in.

use crate::model::StringEncoding;

/// One scanner result: decoded text, its encoding, its `(start, end)` byte
/// range within the scanned buffer, and whether the scanner considers it a
/// high-confidence ("valid") string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub text: String,
    pub encoding: ScanEncoding,
    pub start: usize,
    pub end: usize,
    pub is_valid: bool,
}

/// `spec.md` §4.4 step 2 distinguishes `UTF8` from `WIDE_STRING`; this
/// mirrors that, keeping `StringEncoding` (the crate's public, post-repair
/// encoding tag) and the scanner's raw classification distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEncoding {
    Utf8,
    WideString,
}

impl From<ScanEncoding> for StringEncoding {
    fn from(e: ScanEncoding) -> Self {
        match e {
            ScanEncoding::Utf8 => StringEncoding::Utf8,
            ScanEncoding::WideString => StringEncoding::Utf16Le,
        }
    }
}

/// The external collaborator that finds printable runs in a byte buffer.
pub trait StringScanner {
    /// Find every printable run of at least `min_length` characters.
    fn scan(&self, buf: &[u8], min_length: usize) -> Vec<ScanResult>;

    /// Find the single best-matching string starting at the front of `buf`,
    /// used during wide-string repair (`spec.md` §4.4 step 3).
    fn scan_one(&self, buf: &[u8]) -> Option<ScanResult>;

    /// ASCII-only runs, used by the tightstring engine's pre-loop capture.
    fn ascii(&self, buf: &[u8], min_length: usize) -> Vec<String>;

    /// UTF-16LE-only runs, used by the tightstring engine's pre-loop
    /// capture.
    fn utf16(&self, buf: &[u8], min_length: usize) -> Vec<String>;
}

#[cfg(test)]
pub mod test_support {
    //! Minimal reference scanner. NOT the production string scanner this
    //! crate is designed to be driven by; exists only for this crate's own
    //! tests.
    use super::*;

    #[derive(Debug, Default, Clone, Copy)]
    pub struct DefaultStringScanner;

    fn is_printable_ascii(b: u8) -> bool {
        (0x20..=0x7e).contains(&b)
    }

    fn ascii_runs(buf: &[u8], min_length: usize) -> Vec<(usize, usize, String)> {
        let mut runs = Vec::new();
        let mut start = None;
        for (i, &b) in buf.iter().enumerate() {
            if is_printable_ascii(b) {
                start.get_or_insert(i);
            } else if let Some(s) = start.take() {
                if i - s >= min_length {
                    runs.push((s, i, String::from_utf8_lossy(&buf[s..i]).into_owned()));
                }
            }
        }
        if let Some(s) = start {
            if buf.len() - s >= min_length {
                runs.push((s, buf.len(), String::from_utf8_lossy(&buf[s..]).into_owned()));
            }
        }
        runs
    }

    fn utf16_runs(buf: &[u8], min_length: usize) -> Vec<(usize, usize, String)> {
        let mut runs = Vec::new();
        let mut current = String::new();
        let mut start = None;
        let mut i = 0;
        while i + 1 < buf.len() {
            let unit = u16::from_le_bytes([buf[i], buf[i + 1]]);
            if (0x20..=0x7e).contains(&unit) {
                start.get_or_insert(i);
                current.push(unit as u8 as char);
                i += 2;
                continue;
            }
            if current.chars().count() >= min_length {
                runs.push((start.unwrap(), i, current.clone()));
            }
            current.clear();
            start = None;
            i += 2;
        }
        if current.chars().count() >= min_length {
            runs.push((start.unwrap(), buf.len(), current));
        }
        runs
    }

    impl StringScanner for DefaultStringScanner {
        fn scan(&self, buf: &[u8], min_length: usize) -> Vec<ScanResult> {
            let mut out: Vec<ScanResult> = ascii_runs(buf, min_length)
                .into_iter()
                .map(|(start, end, text)| ScanResult {
                    text,
                    encoding: ScanEncoding::Utf8,
                    start,
                    end,
                    is_valid: true,
                })
                .collect();
            out.extend(utf16_runs(buf, min_length).into_iter().map(
                |(start, end, text)| ScanResult {
                    text,
                    encoding: ScanEncoding::WideString,
                    start,
                    end,
                    is_valid: true,
                },
            ));
            out.sort_by_key(|r| r.start);
            out
        }

        fn scan_one(&self, buf: &[u8]) -> Option<ScanResult> {
            self.scan(buf, 1).into_iter().next()
        }

        fn ascii(&self, buf: &[u8], min_length: usize) -> Vec<String> {
            ascii_runs(buf, min_length)
                .into_iter()
                .map(|(_, _, s)| s)
                .collect()
        }

        fn utf16(&self, buf: &[u8], min_length: usize) -> Vec<String> {
            utf16_runs(buf, min_length)
                .into_iter()
                .map(|(_, _, s)| s)
                .collect()
        }
    }

    #[test]
    fn scans_ascii_run() {
        let scanner = DefaultStringScanner;
        let results = scanner.scan(b"\x00\x00hello\x00\x00", 4);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "hello");
        assert_eq!(results[0].encoding, ScanEncoding::Utf8);
    }
}

//! False-positive filtering for recovered strings (`spec.md` §4.1).
//!
//! Two levels, both pure functions over a candidate string: a strip level
//! applied to every candidate, and a stricter level applied only to strings
//! that are already short after stripping. Patterns are compiled once into
//! `OnceLock`s rather than per call, since this runs over every candidate
//! string the static and tightstring scanners produce.

use std::sync::OnceLock;

use regex::Regex;

/// Candidates longer than this are dropped before any stripping is
/// attempted; bounds pathological inputs (`original_source/floss/utils.py`'s
/// `MAX_STRING_LENGTH` guard in `extract_strings`).
pub const MAX_STRING_LENGTH: usize = 1_000_000;

const MAX_STRICT_LENGTH: usize = 6;

macro_rules! regex {
    ($re:expr) => {{
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new($re).expect("static regex is valid"))
    }};
}

fn fp_filter_prefix() -> &'static Regex {
    regex!(r"^.{0,2}[0pP]?[\]\^\[_\\V]A")
}

fn fp_filter_suffix() -> &'static Regex {
    regex!(r"[0pP]?[VWU][A@]$|Tp$")
}

fn fp_filter_rep_chars_1() -> &'static Regex {
    regex!(r"([ -~])\1{3,}")
}

fn fp_filter_rep_chars_2() -> &'static Regex {
    regex!(r"([^% ]{4})\1{4,}")
}

fn fp_filter_strict_include() -> &'static Regex {
    regex!(r"^\[.*?\]$|%[sd]")
}

fn fp_filter_strict_known_fp() -> &'static Regex {
    regex!(r"^O.*A$")
}

fn fp_filter_strict_special_chars() -> &'static Regex {
    regex!(r"[^A-Za-z0-9.]")
}

/// Fixed blocklist of CRT/runtime noise strings (`spec.md` §4.1), including
/// the single string made of every printable ASCII character in order.
const BLOCKLIST: &[&str] = &[
    "R6016",
    "R6030",
    "Program: ",
    "Runtime Error!",
    "bad locale name",
    "ios_base::badbit set",
    "ios_base::eofbit set",
    "ios_base::failbit set",
    "- CRT not initialized",
    "<program name unknown>",
    "- floating point not loaded",
    "- not enough space for thread data",
    " !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~",
];

/// Strip known false-positive prefixes/suffixes/repeats from `s`. Applied to
/// every candidate, regardless of length.
pub fn strip(s: &str) -> String {
    let mut out = s.to_string();
    for re in [
        fp_filter_prefix(),
        fp_filter_suffix(),
        fp_filter_rep_chars_1(),
        fp_filter_rep_chars_2(),
    ] {
        out = re.replace_all(&out, "").into_owned();
    }

    if out.chars().count() <= MAX_STRICT_LENGTH
        && !fp_filter_strict_include().is_match(&out)
    {
        out = fp_filter_strict_known_fp().replace(&out, "").into_owned();
        out = fp_filter_strict_special_chars()
            .replace_all(&out, "")
            .into_owned();
    }

    out
}

/// Apply the full filter to `s`: strip, then reject on minimum length or
/// blocklist membership. Returns `None` if the candidate should be dropped.
///
/// Idempotent: `filter(filter(s).unwrap_or(""))` is a no-op on whatever
/// `filter` returns, since `strip` only ever removes characters that the
/// same patterns would also match on a second pass.
pub fn filter(s: &str, min_length: usize) -> Option<String> {
    if s.len() > MAX_STRING_LENGTH {
        return None;
    }
    let stripped = strip(s);
    if stripped.chars().count() < min_length {
        return None;
    }
    if BLOCKLIST.contains(&stripped.as_str()) {
        return None;
    }
    Some(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklist_rejects_known_noise() {
        assert_eq!(filter("Runtime Error!", 4), None);
    }

    #[test]
    fn strip_prefix_noise() {
        // "pVAHelloWorld" -> "HelloWorld"
        assert_eq!(strip("pVAHelloWorld"), "HelloWorld");
        assert_eq!(filter("pVAHelloWorld", 4), Some("HelloWorld".to_string()));
    }

    #[test]
    fn strip_below_min_length_is_dropped() {
        assert_eq!(filter("pVAHi", 4), None);
    }

    #[test]
    fn filter_is_idempotent() {
        for s in ["pVAHelloWorld", "aaaaHello", "[ESC]", "%s.dll", "plainstring"] {
            let once = filter(s, 1);
            let twice = once.as_deref().and_then(|s| filter(s, 1));
            assert_eq!(once, twice, "filter not idempotent for {s:?}");
        }
    }

    #[test]
    fn repeated_char_runs_are_stripped() {
        assert_eq!(strip("AAAAhello"), "hello");
    }

    #[test]
    fn repeated_group_runs_are_stripped() {
        let s = "/v7+/v7+/v7+/v7+/v7+hello";
        assert_eq!(strip(s), "hello");
    }

    #[test]
    fn format_strings_survive_strict_pass() {
        // contains %d and is short enough to hit the strict pass, which
        // should spare it because of the %[sd] carve-out
        assert_eq!(filter("%d.dll", 4), Some("%d.dll".to_string()));
    }

    #[test]
    fn bracketed_strings_survive_strict_pass() {
        assert_eq!(filter("[Alt]", 1), Some("[Alt]".to_string()));
    }
}

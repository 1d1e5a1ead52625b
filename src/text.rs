//! Free-text canonicalization used before any comparison or storage.
//!
//! The remote directory is inconsistent about encoding: the same profile can
//! carry smart quotes, en/em dashes, mojibake from a bad cp1252 round-trip,
//! and arbitrary whitespace. Every component normalizes through here first.

use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

/// Byte sequence produced when U+2013 is decoded as cp1252 somewhere upstream.
const MOJIBAKE_EN_DASH: &str = "\u{201A}\u{00C4}\u{00EC}";

/// Smart-punctuation replacements applied after the NFKC fold.
const PUNCT_SUBS: &[(char, char)] = &[
    ('\u{2013}', '-'), // en-dash
    ('\u{2014}', '-'), // em-dash
    ('\u{201C}', '"'),
    ('\u{201D}', '"'),
    ('\u{2018}', '\''),
    ('\u{2019}', '\''),
];

/// Canonicalizes free-form text: NFKC fold, plain-ASCII punctuation,
/// whitespace runs collapsed to single spaces, ends trimmed.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let folded: String = text.nfkc().collect();
    let mut cleaned = folded.replace(MOJIBAKE_EN_DASH, "-");
    for &(orig, repl) in PUNCT_SUBS {
        if cleaned.contains(orig) {
            cleaned = cleaned.replace(orig, &repl.to_string());
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes a JSON value that is expected to be a string.
///
/// The directory sometimes returns `null` or an object where a string is
/// documented; anything non-string yields an empty string rather than failing.
pub fn normalize_json(value: &Value) -> String {
    match value {
        Value::String(s) => normalize(s),
        _ => String::new(),
    }
}

/// Returns a URL-safe slug: lowercase ASCII, hyphen-separated.
///
/// Used to build human-readable profile URLs from display names.
pub fn slugify(text: &str) -> String {
    let decomposed: String = text.nfkd().filter(|c| c.is_ascii()).collect();
    let mut slug = String::with_capacity(decomposed.len());
    let mut last_hyphen = true; // suppress leading hyphens
    for c in decomposed.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_hyphen = false;
        } else if (c.is_whitespace() || c == '-') && !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

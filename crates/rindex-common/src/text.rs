//! Text normalization applied to every context value before storage
//!
//! Connectors scrape text from HTML-ish abstracts, XML fields and JSON
//! strings. Everything goes through [`normalize`] so the annotation stage sees
//! plain, single-spaced text.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Maximum byte length of a MySQL `TEXT` column
pub const MAX_TEXT_BYTES: usize = 65_535;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"<(?:/?[A-Za-z]|!--)[^<>]{0,2048}>").expect("static regex")
});

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("static regex")
});

static WS_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\s+").expect("static regex")
});

/// Strip markup, decode entities, collapse whitespace and trim
pub fn normalize(text: &str) -> String {
    let without_tags = TAG_RE.replace_all(text, " ");
    let decoded = decode_entities(&without_tags);
    WS_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Decode named and numeric HTML entities; unknown entities are kept verbatim
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body
                .strip_prefix("#x")
                .or_else(|| body.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "deg" => '\u{00B0}',
        "micro" => '\u{00B5}',
        "plusmn" => '\u{00B1}',
        "alpha" => '\u{03B1}',
        "beta" => '\u{03B2}',
        "gamma" => '\u{03B3}',
        _ => return None,
    })
}

/// Normalize each value, drop empties and repeats, join with `", "`
pub fn join_values<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|v| normalize(v.as_ref()))
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Cut `text` to at most `max_bytes` without splitting a character
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

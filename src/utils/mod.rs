//! Utility functions and helpers.

pub mod http;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Resolve the feed's escape sequences in a text value.
///
/// `\,` becomes `, ` and `\;` becomes `;`. Line escapes (`\n`) are left
/// alone; callers that care about line structure handle them.
pub fn unescape_text(value: &str) -> String {
    value.replace("\\,", ", ").replace("\\;", ";")
}

/// Remove accents and other combining marks (`é` -> `e`).
pub fn strip_diacritics(value: &str) -> String {
    value.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Drop a trailing `(123)` capacity tag from a room name and trim it.
pub fn strip_numeric_tag(location: &str) -> String {
    let trimmed = location.trim_end();
    if let Some(body) = trimmed.strip_suffix(')') {
        if let Some(open) = body.rfind('(') {
            let tag = &body[open + 1..];
            if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_digit()) {
                return body[..open].trim().to_string();
            }
        }
    }
    trimmed.trim().to_string()
}

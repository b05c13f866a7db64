//! Configuration file parsing utilities.
//!
//! Helpers for the `key = value` format used by `settings.conf`.

/// What: Check if a line should be skipped (empty or comment).
///
/// Inputs:
/// - `line`: Line to check
///
/// Output:
/// - `true` if the line should be skipped, `false` otherwise
///
/// Details:
/// - Skips empty lines and lines starting with `#`, `//`, or `;`
#[must_use]
pub fn skip_comment_or_empty(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("//")
        || trimmed.starts_with(';')
}

/// What: Parse a key-value pair from a line.
///
/// Inputs:
/// - `line`: Line containing key=value format
///
/// Output:
/// - `Some((key, value))` if parsing succeeds, `None` otherwise
///
/// Details:
/// - Splits on the first `=` character.
/// - Keys are lowercased and `.`, `-`, and spaces become `_`.
/// - Inline comments are removed from the value via [`strip_inline_comment`].
#[must_use]
pub fn parse_key_value(line: &str) -> Option<(String, String)> {
    let (raw_key, raw_value) = line.trim().split_once('=')?;
    let key = raw_key.trim().to_lowercase().replace(['.', '-', ' '], "_");
    if key.is_empty() {
        return None;
    }
    Some((key, strip_inline_comment(raw_value).to_string()))
}

/// What: Remove a trailing inline comment from a value.
///
/// Inputs:
/// - `s`: Raw value text.
///
/// Output:
/// - Trimmed value without the comment.
///
/// Details:
/// - A comment starts at ` #` or ` //` (the marker must follow whitespace), so URLs such as
///   `https://host/a#frag` survive intact.
#[must_use]
pub fn strip_inline_comment(s: &str) -> &str {
    let bytes = s.as_bytes();
    for (i, window) in bytes.windows(2).enumerate() {
        if !window[0].is_ascii_whitespace() {
            continue;
        }
        let rest = &s[i + 1..];
        if rest.starts_with('#') || rest.starts_with("//") {
            return s[..i].trim();
        }
    }
    s.trim()
}

/// What: Interpret common truthy spellings.
///
/// Output:
/// - `true` for `true`, `1`, `yes`, `on` (case-insensitive); `false` otherwise.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

//! Small helpers for time formatting, file naming, and command templates.
//!
//! Used by logging, the install pipeline, and the settings loader.

pub mod config;

/// What: Milliseconds since the Unix epoch according to the wall clock.
///
/// Output:
/// - Current time in milliseconds, or `0` if the clock is before the epoch.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis().max(0)
}

/// What: Convert an optional Unix timestamp (seconds) to a UTC date-time string.
///
/// Inputs:
/// - `ts`: Optional Unix timestamp in seconds since epoch.
///
/// Output:
/// - `YYYY-MM-DD HH:MM:SS` (UTC), an empty string for `None`, or the numeric value for
///   timestamps chrono cannot represent.
#[must_use]
pub fn ts_to_date(ts: Option<i64>) -> String {
    let Some(t) = ts else {
        return String::new();
    };
    chrono::DateTime::from_timestamp(t, 0).map_or_else(
        || t.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

/// What: Turn a package identifier into a safe file stem.
///
/// Inputs:
/// - `package`: Package identifier such as `com.example.player`.
///
/// Output:
/// - String containing only ASCII alphanumerics, `.`, `-` and `_`; other characters become `_`.
///
/// Details:
/// - Leading dots are replaced so the result can never name a hidden file or `..`.
/// - An empty identifier yields `"package"`.
#[must_use]
pub fn file_stem_for(package: &str) -> String {
    let mut out: String = package
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let leading = out.len() - out.trim_start_matches('.').len();
    out.replace_range(0..leading, &"_".repeat(leading));
    if out.is_empty() {
        "package".to_string()
    } else {
        out
    }
}

/// What: Split a command template into program and arguments, substituting placeholders.
///
/// Inputs:
/// - `template`: Whitespace-separated command line, e.g. `xdg-open {path}`.
/// - `vars`: `(placeholder, value)` pairs; `{name}` tokens are replaced inside each word.
///
/// Output:
/// - `Some((program, args))`, or `None` when the template is blank.
///
/// Details:
/// - Substitution happens per word after splitting, so values containing spaces stay a
///   single argument.
#[must_use]
pub fn expand_command(template: &str, vars: &[(&str, &str)]) -> Option<(String, Vec<String>)> {
    let mut words = template.split_whitespace().map(|w| {
        let mut word = w.to_string();
        for (key, value) in vars {
            word = word.replace(&format!("{{{key}}}"), value);
        }
        word
    });
    let program = words.next()?;
    Some((program, words.collect()))
}

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub(crate) mod browser;
mod markdown;

pub use markdown::{code_blocks, render_markdown};

pub(crate) const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Wall-clock epoch milliseconds.
///
/// `chrono` reads `Date.now()` on wasm32 and the system clock elsewhere, so the
/// same call works in the browser and in native tests.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// RFC 3339 timestamp for outbound payloads.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// First markdown H1 (`# Title`) of `text`, if the text starts with one.
pub(crate) fn leading_heading(text: &str) -> Option<String> {
    let first = text.trim_start().lines().next()?;
    let rest = first.strip_prefix('#')?;
    if rest.starts_with('#') {
        return None;
    }
    let title = rest.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// `Mar 4, 2025` style date for list rows. Empty for out-of-range stamps.
pub(crate) fn format_day(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|d| d.format("%b %-d, %Y").to_string())
        .unwrap_or_default()
}

/// `March 4, 2025` style date for certificates.
pub(crate) fn format_long_day(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_default()
}

/// `title` with each whitespace run replaced by `_`, for download file names.
pub(crate) fn file_stem(title: &str) -> String {
    let stem = title.split_whitespace().collect::<Vec<_>>().join("_");
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem
    }
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_is_unique() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn test_leading_heading() {
        assert_eq!(leading_heading("# Glaucoma\n\nbody").as_deref(), Some("Glaucoma"));
        assert_eq!(leading_heading("  #Cornea").as_deref(), Some("Cornea"));
        assert_eq!(leading_heading("## Sub heading"), None);
        assert_eq!(leading_heading("plain text"), None);
        assert_eq!(leading_heading("#   "), None);
    }

    #[test]
    fn test_format_day() {
        assert_eq!(format_day(1_741_046_400_000), "Mar 4, 2025");
        assert_eq!(format_day(i64::MAX), "");
    }

    #[test]
    fn test_format_long_day() {
        assert_eq!(format_long_day(1_741_046_400_000), "March 4, 2025");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Myopia  Control\tBasics"), "Myopia_Control_Basics");
        assert_eq!(file_stem("  "), "untitled");
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Angle Closure", "closure"));
        assert!(contains_ignore_case("anything", ""));
        assert!(!contains_ignore_case("Retina", "lens"));
    }
}

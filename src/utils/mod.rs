//! Common utilities and helper functions
//!
//! This module provides text helpers shared by the search client, the detail
//! fetcher and the exporter.

pub mod error;

use chrono::{FixedOffset, TimeZone};
use regex::Regex;
use std::sync::OnceLock;

/// Korea Standard Time offset in seconds (UTC+9)
const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Remove HTML tags and decode entities
///
/// Search API titles and snippets carry highlight markup such as
/// `<strong class="search_keyword">`.
pub fn strip_html(text: &str) -> String {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();

    let re = TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("Invalid regex pattern"));

    let stripped = re.replace_all(text, "");
    html_escape::decode_html_entities(&stripped).trim().to_string()
}

/// Format a millisecond epoch timestamp as `YYYY.MM.DD` in KST
///
/// A zero (or unrepresentable) timestamp yields an empty string.
pub fn format_timestamp(millis: i64) -> String {
    if millis == 0 {
        return String::new();
    }

    let Some(kst) = FixedOffset::east_opt(KST_OFFSET_SECS) else {
        return String::new();
    };

    match kst.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y.%m.%d").to_string(),
        None => String::new(),
    }
}

/// Truncate text to at most `max_chars` characters
///
/// Counts characters, not bytes, so multi-byte Hangul is never split.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Parse a count string consisting solely of ASCII digits
pub fn parse_count(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<strong class=\"search_keyword\">맛집</strong> 후기 "),
            "맛집 후기"
        );
        assert_eq!(strip_html("a &amp; b &quot;c&quot;"), "a & b \"c\"");
        assert_eq!(strip_html("plain"), "plain");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "");
        // 2024-01-15T00:00:00+09:00
        assert_eq!(format_timestamp(1_705_244_400_000), "2024.01.15");
        // 2024-01-14T15:30:00Z is already the 15th in KST
        assert_eq!(format_timestamp(1_705_246_200_000), "2024.01.15");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("안녕하세요", 2), "안녕");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(" 42 "), Some(42));
        assert_eq!(parse_count("1,024"), None);
        assert_eq!(parse_count("공감"), None);
        assert_eq!(parse_count(""), None);
    }
}

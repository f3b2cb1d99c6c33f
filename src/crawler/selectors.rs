//! CSS selectors for Naver Blog post pages
//!
//! Blog markup changes over time (SmartEditor ONE, SE2, legacy skins), so every
//! metric is located through an ordered list of fallbacks. The whole set is plain
//! data and can be replaced from the configuration file without touching the
//! extraction code.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// How a count selector's text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountPattern {
    /// Text must consist only of digits, e.g. `12`
    Digits,
    /// Text contains a labelled comment count, e.g. `댓글 12`
    CommentLabel,
}

impl CountPattern {
    /// Extract the count from an element's inner text
    pub fn extract(&self, text: &str) -> Option<u64> {
        match self {
            Self::Digits => crate::utils::parse_count(text),
            Self::CommentLabel => comment_label_count(text),
        }
    }
}

/// A selector paired with the way its text is read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSelector {
    pub selector: String,
    pub pattern: CountPattern,
}

impl CountSelector {
    fn new(selector: &str, pattern: CountPattern) -> Self {
        Self {
            selector: selector.to_string(),
            pattern,
        }
    }
}

/// Ordered selector fallbacks for one blog platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSet {
    /// Substring identifying the frame that holds the post body
    pub content_frame_pattern: String,

    /// Body containers, newest editor first
    pub content: Vec<String>,

    /// Selector that appears once the reaction widgets have rendered
    pub reaction_ready: String,

    /// Likes count candidates
    pub likes: Vec<CountSelector>,

    /// Per-reaction counters summed as the last likes fallback
    pub likes_sum: String,

    /// Comment count candidates
    pub comments: Vec<CountSelector>,

    /// Elements scanned for a `댓글 N` label as the last comments fallback
    pub comments_scan: String,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            content_frame_pattern: "PostView".to_string(),
            content: vec![
                ".se-main-container".to_string(),
                "#postViewArea".to_string(),
                "#post-view".to_string(),
                ".se_component_wrap".to_string(),
            ],
            reaction_ready: "span.u_likeit_list_count._count, #floating_bottom_commentCount"
                .to_string(),
            likes: vec![
                CountSelector::new("span.u_likeit_list_count._count", CountPattern::Digits),
                CountSelector::new("span.u_likeit_text._count", CountPattern::Digits),
                CountSelector::new("#sympathyCount", CountPattern::Digits),
            ],
            likes_sum: "span.u_likeit_list_count._count".to_string(),
            comments: vec![
                CountSelector::new("#floating_bottom_commentCount", CountPattern::Digits),
                CountSelector::new("a.btn_comment", CountPattern::CommentLabel),
                CountSelector::new("span.comment_wrap", CountPattern::CommentLabel),
            ],
            comments_scan: "a, button, span".to_string(),
        }
    }
}

/// Read `댓글 N` out of a label
pub fn comment_label_count(text: &str) -> Option<u64> {
    static COMMENT_RE: OnceLock<Regex> = OnceLock::new();

    let re = COMMENT_RE.get_or_init(|| Regex::new(r"댓글\s*(\d+)").expect("Invalid regex pattern"));

    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fallback_order() {
        let set = SelectorSet::default();
        assert_eq!(set.content[0], ".se-main-container");
        assert_eq!(set.content.len(), 4);
        assert_eq!(set.likes[0].selector, "span.u_likeit_list_count._count");
        assert_eq!(set.comments[0].selector, "#floating_bottom_commentCount");
    }

    #[test]
    fn test_count_patterns() {
        assert_eq!(CountPattern::Digits.extract("15"), Some(15));
        assert_eq!(CountPattern::Digits.extract("댓글 15"), None);
        assert_eq!(CountPattern::CommentLabel.extract("댓글 15"), Some(15));
        assert_eq!(CountPattern::CommentLabel.extract("댓글3개"), Some(3));
        assert_eq!(CountPattern::CommentLabel.extract("공감 3"), None);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let set: SelectorSet = toml::from_str(r#"content = [".post-body"]"#).unwrap();
        assert_eq!(set.content, vec![".post-body".to_string()]);
        assert_eq!(set.content_frame_pattern, "PostView");
        assert_eq!(set.likes.len(), 3);
    }
}

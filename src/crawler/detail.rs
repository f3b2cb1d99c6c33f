//! Post detail extraction
//!
//! Loads one post in a browser page and reads body text, likes and comments
//! out of the frame that holds the post. Extraction never fails the caller:
//! problems surface as sentinel content and zero counts.

use std::time::Duration;

use crate::config::BrowserConfig;
use crate::crawler::browser::{FrameRef, PageDriver};
use crate::crawler::selectors::{CountPattern, CountSelector, SelectorSet};
use crate::models::{ContentMode, Field, FieldSelection, PostDetail, PostMeta};
use crate::utils::error::{BrowserError, ExtractionError};
use crate::utils::truncate_chars;

/// Content when the page did not load in time
pub const CONTENT_TIMEOUT: &str = "[타임아웃: 페이지 로드 실패]";

/// Content when no body container matched
pub const CONTENT_EXTRACTION_FAILED: &str = "[본문 추출 실패]";

/// Longest error message carried into an `[오류: ...]` sentinel
const ERROR_MESSAGE_CHARS: usize = 200;

/// Sentinel content for a failed extraction
pub fn error_sentinel(error: &ExtractionError) -> String {
    match error {
        ExtractionError::NavigationTimeout { .. } => CONTENT_TIMEOUT.to_string(),
        other => format!(
            "[오류: {}]",
            truncate_chars(&other.to_string(), ERROR_MESSAGE_CHARS)
        ),
    }
}

/// Pick the frame holding the post body
///
/// Prefers the first frame whose URL contains `pattern`, then the first nested
/// frame, then the top-level document. With depth-first frame order the first
/// nested frame is the first direct child of the top-level document.
pub fn select_content_frame(frames: &[FrameRef], pattern: &str, page_url: &str) -> FrameRef {
    if let Some(frame) = frames.iter().find(|f| f.url.contains(pattern)) {
        return frame.clone();
    }
    if let Some(frame) = frames.get(1) {
        return frame.clone();
    }
    frames.first().cloned().unwrap_or_else(|| FrameRef {
        index: 0,
        url: page_url.to_string(),
    })
}

/// Extracts post details through a [`PageDriver`]
#[derive(Debug, Clone)]
pub struct DetailFetcher {
    selectors: SelectorSet,
    navigation_timeout: Duration,
    frame_settle: Duration,
    reaction_wait: Duration,
}

impl DetailFetcher {
    pub fn new(selectors: SelectorSet, config: &BrowserConfig) -> Self {
        Self {
            selectors,
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            frame_settle: Duration::from_millis(config.frame_settle_ms),
            reaction_wait: Duration::from_millis(config.reaction_wait_ms),
        }
    }

    /// Override the navigation timeout and waits
    #[must_use]
    pub fn with_timings(
        mut self,
        navigation_timeout: Duration,
        frame_settle: Duration,
        reaction_wait: Duration,
    ) -> Self {
        self.navigation_timeout = navigation_timeout;
        self.frame_settle = frame_settle;
        self.reaction_wait = reaction_wait;
        self
    }

    pub fn selectors(&self) -> &SelectorSet {
        &self.selectors
    }

    /// Load `meta.url` and extract the requested details
    ///
    /// Content starts as the snippet in preview mode and empty otherwise; it is
    /// only replaced in full mode. Likes and comments are read only when
    /// requested.
    pub async fn fetch_detail(
        &self,
        page: &dyn PageDriver,
        meta: &PostMeta,
        fields: &FieldSelection,
        mode: ContentMode,
    ) -> PostDetail {
        let mut detail = PostDetail::from_meta(meta.clone(), mode);

        if let Err(e) = self.extract_into(page, &mut detail, fields, mode).await {
            tracing::warn!(url = %meta.url, error = %e, "Post extraction failed");
            if mode == ContentMode::Full {
                detail.content = error_sentinel(&e);
            }
        }

        detail
    }

    async fn extract_into(
        &self,
        page: &dyn PageDriver,
        detail: &mut PostDetail,
        fields: &FieldSelection,
        mode: ContentMode,
    ) -> Result<(), ExtractionError> {
        let url = detail.meta.url.clone();

        match tokio::time::timeout(self.navigation_timeout, page.goto(&url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ExtractionError::NavigationTimeout {
                    url,
                    timeout: self.navigation_timeout,
                })
            }
        }

        // Post bodies live in an iframe that loads after the outer document
        if !self.frame_settle.is_zero() {
            tokio::time::sleep(self.frame_settle).await;
        }

        let frames = page.frames().await?;
        let frame = select_content_frame(&frames, &self.selectors.content_frame_pattern, &url);
        tracing::debug!(url = %url, frame = %frame.url, frames = frames.len(), "Content frame selected");

        if mode == ContentMode::Full {
            detail.content = self.extract_content(page, &frame).await;
        }

        let wants_likes = fields.wants(Field::Likes);
        let wants_comments = fields.wants(Field::Comments);

        if wants_likes || wants_comments {
            self.wait_for_reactions(page, &frame).await;
        }
        if wants_likes {
            detail.likes = self.extract_likes(page, &frame).await.unwrap_or_else(|e| {
                tracing::debug!(url = %url, error = %e, "Likes extraction failed");
                0
            });
        }
        if wants_comments {
            detail.comments = self.extract_comments(page, &frame).await.unwrap_or_else(|e| {
                tracing::debug!(url = %url, error = %e, "Comments extraction failed");
                0
            });
        }

        Ok(())
    }

    /// Best-effort wait for the reaction widgets; timeouts are ignored
    async fn wait_for_reactions(&self, page: &dyn PageDriver, frame: &FrameRef) {
        match page
            .wait_for_selector(frame, &self.selectors.reaction_ready, self.reaction_wait)
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::debug!(frame = %frame.url, "Reaction widgets did not render in time"),
            Err(e) => tracing::debug!(frame = %frame.url, error = %e, "Waiting for reaction widgets failed"),
        }
    }

    async fn extract_content(&self, page: &dyn PageDriver, frame: &FrameRef) -> String {
        for selector in &self.selectors.content {
            match page.inner_text(frame, selector).await {
                Ok(Some(text)) => return text.trim().to_string(),
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(selector = %selector, error = %e, "Content lookup failed");
                    return CONTENT_EXTRACTION_FAILED.to_string();
                }
            }
        }
        CONTENT_EXTRACTION_FAILED.to_string()
    }

    async fn extract_likes(
        &self,
        page: &dyn PageDriver,
        frame: &FrameRef,
    ) -> Result<u64, BrowserError> {
        if let Some(count) = self.first_count(page, frame, &self.selectors.likes).await? {
            return Ok(count);
        }

        // Several reaction types render one counter each
        let sum: u64 = page
            .inner_texts(frame, &self.selectors.likes_sum)
            .await?
            .iter()
            .filter_map(|text| CountPattern::Digits.extract(text))
            .sum();

        Ok(sum)
    }

    async fn extract_comments(
        &self,
        page: &dyn PageDriver,
        frame: &FrameRef,
    ) -> Result<u64, BrowserError> {
        if let Some(count) = self.first_count(page, frame, &self.selectors.comments).await? {
            return Ok(count);
        }

        let scanned = page
            .inner_texts(frame, &self.selectors.comments_scan)
            .await?
            .iter()
            .find_map(|text| CountPattern::CommentLabel.extract(text));

        Ok(scanned.unwrap_or(0))
    }

    /// First candidate whose text matches its pattern
    ///
    /// Only the first element of each selector is considered.
    async fn first_count(
        &self,
        page: &dyn PageDriver,
        frame: &FrameRef,
        candidates: &[CountSelector],
    ) -> Result<Option<u64>, BrowserError> {
        for candidate in candidates {
            if let Some(text) = page.inner_text(frame, &candidate.selector).await? {
                if let Some(count) = candidate.pattern.extract(&text) {
                    return Ok(Some(count));
                }
            }
        }
        Ok(None)
    }
}

//! Controllable scraping pipeline
//!
//! Composes the search listing with per-post detail extraction and yields
//! results one at a time as a lazy stream.
//!
//! # Flow
//!
//! ```text
//!  count ──▶ Total ──▶ fetch_pages ──▶ ┌──────────────────────────────┐
//!                                      │ for each post                │
//!                                      │   stop? ──▶ end              │
//!                                      │   detail (browser) or meta   │
//!                                      │   yield Item                 │
//!                                      │   checkpoint(jitter) ──▶ end │
//!                                      └──────────────────────────────┘
//! ```
//!
//! Nothing happens until the stream is polled. In browser mode a single
//! session and page serve the whole run; the session is closed when the loop
//! ends and, if the stream is dropped early or fails, by the session guard.
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use naver_blog_scraper::config::Config;
//! use naver_blog_scraper::crawler::gate::ControlGate;
//! use naver_blog_scraper::crawler::pipeline::{PipelineEvent, ScrapePipeline};
//! use naver_blog_scraper::models::{ContentMode, FieldSelection, ScrapeRequest};
//! use std::sync::Arc;
//!
//! # async fn example() -> naver_blog_scraper::Result<()> {
//! let pipeline = Arc::new(ScrapePipeline::from_config(&Config::default())?);
//! let request = ScrapeRequest::new(
//!     "맛집",
//!     "2024-01-01",
//!     "2024-01-31",
//!     FieldSelection::parse("url,date"),
//!     ContentMode::Preview,
//! )?;
//!
//! let stream = pipeline.run(request, Arc::new(ControlGate::new()));
//! futures::pin_mut!(stream);
//! while let Some(event) = stream.next().await {
//!     if let PipelineEvent::Item(post) = event? {
//!         println!("{}", post.meta.title);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use async_stream::try_stream;
use futures::Stream;
use std::sync::Arc;

use crate::config::{Config, DelayRange};
use crate::crawler::browser::{BrowserLauncher, ChromiumLauncher, SessionGuard};
use crate::crawler::detail::{DetailFetcher, CONTENT_EXTRACTION_FAILED, CONTENT_TIMEOUT};
use crate::crawler::gate::{Checkpoint, ControlGate};
use crate::crawler::search::SearchClient;
use crate::error::Result;
use crate::models::{PostDetail, ScrapeRequest};

/// Event produced by a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Total matching posts, emitted once before any item
    Total(u64),
    /// One post, in listing order
    Item(PostDetail),
}

/// Per-run counters, logged when a run ends
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: u64,
    pub listed: usize,
    pub emitted: usize,
    pub failed_extractions: usize,
    pub stopped: bool,
}

impl RunSummary {
    fn record(&mut self, detail: &PostDetail) {
        self.emitted += 1;
        if is_sentinel(&detail.content) {
            self.failed_extractions += 1;
        }
    }

    fn log(&self, keyword: &str, browser: bool) {
        tracing::info!(
            keyword,
            browser,
            total = self.total,
            listed = self.listed,
            emitted = self.emitted,
            failed_extractions = self.failed_extractions,
            stopped = self.stopped,
            "Scrape run finished"
        );
    }
}

fn is_sentinel(content: &str) -> bool {
    content == CONTENT_EXTRACTION_FAILED || content == CONTENT_TIMEOUT || content.starts_with("[오류:")
}

/// Search listing plus detail extraction under a control gate
pub struct ScrapePipeline {
    search: SearchClient,
    launcher: Arc<dyn BrowserLauncher>,
    fetcher: DetailFetcher,
    browser_item_delay: DelayRange,
    metadata_item_delay: DelayRange,
}

impl ScrapePipeline {
    pub fn new(
        search: SearchClient,
        launcher: Arc<dyn BrowserLauncher>,
        fetcher: DetailFetcher,
    ) -> Self {
        let defaults = crate::config::PipelineConfig::default();
        Self {
            search,
            launcher,
            fetcher,
            browser_item_delay: defaults.browser_item_delay,
            metadata_item_delay: defaults.metadata_item_delay,
        }
    }

    /// Production pipeline: Naver search endpoint and Chromium
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let search = SearchClient::new(&config.search)?;
        let launcher: Arc<dyn BrowserLauncher> =
            Arc::new(ChromiumLauncher::new(config.browser.clone()));
        let fetcher = DetailFetcher::new(config.selectors.clone(), &config.browser);

        Ok(Self::new(search, launcher, fetcher)
            .with_delays(config.pipeline.browser_item_delay, config.pipeline.metadata_item_delay))
    }

    /// Override the delays between items
    #[must_use]
    pub fn with_delays(mut self, browser_item_delay: DelayRange, metadata_item_delay: DelayRange) -> Self {
        self.browser_item_delay = browser_item_delay;
        self.metadata_item_delay = metadata_item_delay;
        self
    }

    pub fn search(&self) -> &SearchClient {
        &self.search
    }

    pub fn fetcher(&self) -> &DetailFetcher {
        &self.fetcher
    }

    /// Run a scrape as a lazy stream
    ///
    /// Yields `Total` first, then items in listing order. Listing and browser
    /// launch failures end the stream with an error; per-post extraction
    /// problems are carried in the item itself. A stop request ends the
    /// stream without an error.
    pub fn run(
        self: Arc<Self>,
        request: ScrapeRequest,
        gate: Arc<ControlGate>,
    ) -> impl Stream<Item = Result<PipelineEvent>> + Send + 'static {
        let pipeline = self;

        try_stream! {
            let browser = request.needs_browser();
            let mut summary = RunSummary::default();

            tracing::info!(
                keyword = %request.keyword,
                start_date = %request.start_date,
                end_date = %request.end_date,
                content_mode = %request.content_mode,
                browser,
                "Starting scrape run"
            );

            let total = pipeline
                .search
                .count(&request.keyword, &request.start_date, &request.end_date)
                .await?;
            summary.total = total;
            yield PipelineEvent::Total(total);

            let posts = pipeline
                .search
                .fetch_pages(&request.keyword, &request.start_date, &request.end_date, total)
                .await?;
            summary.listed = posts.len();
            let last = posts.len().saturating_sub(1);

            if browser {
                let session = pipeline.launcher.launch().await?;
                let mut guard = SessionGuard::new(session);
                let page = guard.new_page().await?;

                for (index, meta) in posts.iter().enumerate() {
                    if gate.is_stop_requested() {
                        summary.stopped = true;
                        break;
                    }

                    let detail = pipeline
                        .fetcher
                        .fetch_detail(page.as_ref(), meta, &request.fields, request.content_mode)
                        .await;
                    tracing::debug!(index, url = %meta.url, likes = detail.likes, comments = detail.comments, "Post scraped");
                    summary.record(&detail);
                    yield PipelineEvent::Item(detail);

                    if index < last
                        && gate.checkpoint(pipeline.browser_item_delay.sample()).await == Checkpoint::Stop
                    {
                        summary.stopped = true;
                        break;
                    }
                }

                drop(page);
                guard.close().await;
            } else {
                for (index, meta) in posts.iter().enumerate() {
                    if gate.is_stop_requested() {
                        summary.stopped = true;
                        break;
                    }

                    let detail = PostDetail::from_meta(meta.clone(), request.content_mode);
                    summary.record(&detail);
                    yield PipelineEvent::Item(detail);

                    if index < last
                        && gate.checkpoint(pipeline.metadata_item_delay.sample()).await == Checkpoint::Stop
                    {
                        summary.stopped = true;
                        break;
                    }
                }
            }

            summary.log(&request.keyword, browser);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_detection() {
        assert!(is_sentinel(CONTENT_EXTRACTION_FAILED));
        assert!(is_sentinel(CONTENT_TIMEOUT));
        assert!(is_sentinel("[오류: boom]"));
        assert!(!is_sentinel("본문"));
    }

    #[test]
    fn test_summary_counts_failures() {
        let mut summary = RunSummary::default();
        let mut detail = PostDetail::default();
        summary.record(&detail);
        detail.content = CONTENT_EXTRACTION_FAILED.to_string();
        summary.record(&detail);
        assert_eq!(summary.emitted, 2);
        assert_eq!(summary.failed_extractions, 1);
    }
}

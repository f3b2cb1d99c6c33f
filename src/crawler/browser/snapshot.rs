//! Browser driver over saved HTML
//!
//! Serves pre-rendered documents (optionally with nested frames) keyed by URL
//! and evaluates selectors with `scraper`. Used to check selector sets
//! against saved post pages and to run the pipeline without Chromium.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{BrowserLauncher, BrowserSession, FrameRef, PageDriver};
use crate::utils::error::BrowserError;

/// A saved page and the frames it embeds
#[derive(Debug, Clone, Default)]
pub struct SnapshotDocument {
    pub html: String,
    /// (frame url, frame html) in document order
    pub frames: Vec<(String, String)>,
}

impl SnapshotDocument {
    /// Single document without frames
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            frames: Vec::new(),
        }
    }

    /// Add a nested frame
    #[must_use]
    pub fn with_frame(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.frames.push((url.into(), html.into()));
        self
    }
}

/// Shared state of a snapshot "site"
#[derive(Debug, Default)]
pub struct SnapshotSite {
    documents: HashMap<String, SnapshotDocument>,
    load_delay: Duration,
    launches: AtomicUsize,
    closes: AtomicUsize,
    navigations: Mutex<Vec<String>>,
    queries: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SnapshotSite {
    /// Number of browser sessions launched
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Number of browser sessions closed
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// URLs navigated to, in order
    pub fn navigations(&self) -> Vec<String> {
        lock(&self.navigations).clone()
    }

    /// Selectors looked up, in order
    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }

    /// Whether any lookup used `selector`
    pub fn was_queried(&self, selector: &str) -> bool {
        lock(&self.queries).iter().any(|q| q == selector)
    }

    fn record_query(&self, selector: &str) {
        lock(&self.queries).push(selector.to_string());
    }
}

/// Launcher serving snapshot documents
#[derive(Debug, Clone, Default)]
pub struct SnapshotLauncher {
    site: Arc<SnapshotSite>,
}

impl SnapshotLauncher {
    pub fn new(documents: HashMap<String, SnapshotDocument>) -> Self {
        Self::with_load_delay(documents, Duration::ZERO)
    }

    /// Simulate slow page loads
    pub fn with_load_delay(documents: HashMap<String, SnapshotDocument>, load_delay: Duration) -> Self {
        Self {
            site: Arc::new(SnapshotSite {
                documents,
                load_delay,
                ..SnapshotSite::default()
            }),
        }
    }

    /// Shared site state, for inspecting navigation and lookups
    pub fn site(&self) -> Arc<SnapshotSite> {
        Arc::clone(&self.site)
    }
}

#[async_trait]
impl BrowserLauncher for SnapshotLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        self.site.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SnapshotSession {
            site: Arc::clone(&self.site),
        }))
    }
}

struct SnapshotSession {
    site: Arc<SnapshotSite>,
}

#[async_trait]
impl BrowserSession for SnapshotSession {
    async fn new_page(&mut self) -> Result<Box<dyn PageDriver>, BrowserError> {
        Ok(Box::new(SnapshotPage::new(Arc::clone(&self.site))))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.site.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A page showing one snapshot document at a time
pub struct SnapshotPage {
    site: Arc<SnapshotSite>,
    current: Mutex<Option<(String, SnapshotDocument)>>,
}

impl SnapshotPage {
    pub fn new(site: Arc<SnapshotSite>) -> Self {
        Self {
            site,
            current: Mutex::new(None),
        }
    }

    /// HTML source of `frame` in the current document
    fn frame_html(&self, frame: &FrameRef) -> Result<String, BrowserError> {
        let current = lock(&self.current);
        let (_, document) = current
            .as_ref()
            .ok_or_else(|| BrowserError::Protocol("no document loaded".to_string()))?;

        if frame.is_top_level() {
            return Ok(document.html.clone());
        }
        document
            .frames
            .get(frame.index - 1)
            .map(|(_, html)| html.clone())
            .ok_or_else(|| BrowserError::Protocol(format!("frame {} detached", frame.index)))
    }

    fn select_texts(
        &self,
        frame: &FrameRef,
        selector: &str,
        limit: Option<usize>,
    ) -> Result<Vec<String>, BrowserError> {
        self.site.record_query(selector);
        let parsed =
            Selector::parse(selector).map_err(|_| BrowserError::Selector(selector.to_string()))?;
        let html = self.frame_html(frame)?;
        let document = Html::parse_document(&html);

        let texts = document
            .select(&parsed)
            .take(limit.unwrap_or(usize::MAX))
            .map(|el| el.text().collect::<String>())
            .collect();
        Ok(texts)
    }
}

#[async_trait]
impl PageDriver for SnapshotPage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        lock(&self.site.navigations).push(url.to_string());

        if !self.site.load_delay.is_zero() {
            tokio::time::sleep(self.site.load_delay).await;
        }

        let document = self
            .site
            .documents
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::Protocol(format!("net::ERR_NAME_NOT_RESOLVED at {url}")))?;

        *lock(&self.current) = Some((url.to_string(), document));
        Ok(())
    }

    async fn frames(&self) -> Result<Vec<FrameRef>, BrowserError> {
        let current = lock(&self.current);
        let (url, document) = current
            .as_ref()
            .ok_or_else(|| BrowserError::Protocol("no document loaded".to_string()))?;

        let mut frames = vec![FrameRef {
            index: 0,
            url: url.clone(),
        }];
        frames.extend(document.frames.iter().enumerate().map(|(i, (url, _))| FrameRef {
            index: i + 1,
            url: url.clone(),
        }));
        Ok(frames)
    }

    async fn inner_text(
        &self,
        frame: &FrameRef,
        selector: &str,
    ) -> Result<Option<String>, BrowserError> {
        Ok(self.select_texts(frame, selector, Some(1))?.into_iter().next())
    }

    async fn inner_texts(
        &self,
        frame: &FrameRef,
        selector: &str,
    ) -> Result<Vec<String>, BrowserError> {
        self.select_texts(frame, selector, None)
    }

    /// Static documents never change, so this resolves immediately
    async fn wait_for_selector(
        &self,
        frame: &FrameRef,
        selector: &str,
        _timeout: Duration,
    ) -> Result<bool, BrowserError> {
        Ok(!self.select_texts(frame, selector, Some(1))?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher() -> SnapshotLauncher {
        let mut docs = HashMap::new();
        docs.insert(
            "https://blog.naver.com/foo/1".to_string(),
            SnapshotDocument::new("<html><body><iframe id=\"mainFrame\"></iframe></body></html>")
                .with_frame(
                    "https://blog.naver.com/PostView.naver?blogId=foo&logNo=1",
                    "<div class=\"se-main-container\"><p>본문</p><p>둘째</p></div>",
                ),
        );
        SnapshotLauncher::new(docs)
    }

    #[tokio::test]
    async fn test_frames_and_text() {
        let launcher = launcher();
        let mut session = launcher.launch().await.unwrap();
        let page = session.new_page().await.unwrap();

        page.goto("https://blog.naver.com/foo/1").await.unwrap();
        let frames = page.frames().await.unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames[1].url.contains("PostView"));

        let text = page.inner_text(&frames[1], ".se-main-container").await.unwrap();
        assert_eq!(text.as_deref(), Some("본문둘째"));
        assert_eq!(page.inner_text(&frames[0], ".se-main-container").await.unwrap(), None);

        session.close().await.unwrap();
        assert_eq!(launcher.site().closes(), 1);
    }

    #[tokio::test]
    async fn test_unknown_url_fails() {
        let launcher = launcher();
        let mut session = launcher.launch().await.unwrap();
        let page = session.new_page().await.unwrap();
        assert!(page.goto("https://blog.naver.com/missing/9").await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_selector() {
        let launcher = launcher();
        let mut session = launcher.launch().await.unwrap();
        let page = session.new_page().await.unwrap();
        page.goto("https://blog.naver.com/foo/1").await.unwrap();
        let frames = page.frames().await.unwrap();
        let err = page.inner_text(&frames[0], "[[").await.unwrap_err();
        assert!(matches!(err, BrowserError::Selector(_)));
    }
}

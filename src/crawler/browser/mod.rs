//! Headless browser capability
//!
//! The detail fetcher only needs a small slice of a browser: open a page,
//! navigate, enumerate frames and read text by CSS selector. That slice is
//! expressed as three traits so the pipeline can run against Chromium in
//! production and against saved HTML in tests and in `inspect`.
//!
//! - [`BrowserLauncher`] starts a [`BrowserSession`]
//! - [`BrowserSession`] opens [`PageDriver`]s and must be closed explicitly
//! - [`SessionGuard`] closes a session on every exit path

pub mod chromium;
pub mod snapshot;

use async_trait::async_trait;
use std::time::Duration;

use crate::utils::error::BrowserError;

pub use chromium::ChromiumLauncher;
pub use snapshot::{SnapshotLauncher, SnapshotPage};

/// A frame within the current page
///
/// Index 0 is always the top-level document; nested frames follow in
/// depth-first document order, so a frame's own children come right after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRef {
    pub index: usize,
    pub url: String,
}

impl FrameRef {
    pub fn is_top_level(&self) -> bool {
        self.index == 0
    }
}

/// Starts browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a new browser session
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// One running browser
#[async_trait]
pub trait BrowserSession: Send {
    /// Open a new blank page
    async fn new_page(&mut self) -> Result<Box<dyn PageDriver>, BrowserError>;

    /// Shut the browser down
    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

/// One browser tab
///
/// A page is driven by a single caller at a time.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the document to load
    ///
    /// Unbounded; callers wrap it in their own timeout.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Top-level document followed by nested frames
    async fn frames(&self) -> Result<Vec<FrameRef>, BrowserError>;

    /// Inner text of the first element matching `selector` in `frame`
    async fn inner_text(
        &self,
        frame: &FrameRef,
        selector: &str,
    ) -> Result<Option<String>, BrowserError>;

    /// Inner text of every element matching `selector` in `frame`
    async fn inner_texts(&self, frame: &FrameRef, selector: &str)
        -> Result<Vec<String>, BrowserError>;

    /// Wait until `selector` matches in `frame`
    ///
    /// Returns `false` on timeout.
    async fn wait_for_selector(
        &self,
        frame: &FrameRef,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, BrowserError>;
}

/// Closes a browser session when the owning scope ends
///
/// [`SessionGuard::close`] is the normal path and awaits shutdown. If the guard
/// is dropped instead (a consumer abandoned the stream, or an error unwound
/// the run), shutdown is spawned onto the runtime captured at construction.
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
    runtime: Option<tokio::runtime::Handle>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
            runtime: tokio::runtime::Handle::try_current().ok(),
        }
    }

    /// Open a page on the guarded session
    pub async fn new_page(&mut self) -> Result<Box<dyn PageDriver>, BrowserError> {
        match self.session.as_mut() {
            Some(session) => session.new_page().await,
            None => Err(BrowserError::Closed),
        }
    }

    /// Close the session now
    pub async fn close(mut self) {
        if let Some(session) = self.session.take() {
            match session.close().await {
                Ok(()) => tracing::debug!("Browser session closed"),
                Err(e) => tracing::warn!(error = %e, "Failed to close browser session"),
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        match &self.runtime {
            Some(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = session.close().await {
                        tracing::warn!(error = %e, "Browser cleanup on drop failed");
                    } else {
                        tracing::debug!("Browser session closed on drop");
                    }
                });
            }
            None => tracing::warn!("No runtime available; browser session leaked on drop"),
        }
    }
}

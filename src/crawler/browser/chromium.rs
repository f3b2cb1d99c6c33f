//! Chromium driver over the DevTools protocol
//!
//! Frame access goes through in-page scripts: blog post frames are served
//! from the same origin as the outer page, so a frame's `document` is readable
//! from the top-level context. Frames are numbered by a depth-first walk of
//! `window.frames`, matching [`FrameRef`] ordering.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::js::EvaluationResult;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{BrowserLauncher, BrowserSession, FrameRef, PageDriver};
use crate::config::BrowserConfig;
use crate::utils::error::BrowserError;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);
const HANDLER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Pre-order walk of a window and all of its descendant frames
const FRAME_WALK: &str =
    "const walk = (win, out) => { out.push(win); let n = 0; try { n = win.frames.length; } catch (e) {} for (let i = 0; i < n; i++) { walk(win.frames[i], out); } return out; };";

/// Launches headless Chromium instances
pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let mut builder = CdpConfig::builder()
            .arg(format!("--lang={}", self.config.locale))
            .request_timeout(Duration::from_millis(self.config.navigation_timeout_ms));

        if !self.config.headless {
            builder = builder.with_head();
        }
        if self.config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.config.executable {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder.build().map_err(BrowserError::Launch)?;
        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The handler drives the CDP connection and must be polled for the
        // browser's lifetime.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!(error = %e, "CDP handler event error");
                }
            }
        });

        tracing::info!(headless = self.config.headless, "Chromium launched");

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
            user_agent: self.config.user_agent.clone(),
            locale: self.config.locale.clone(),
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    user_agent: String,
    locale: String,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&mut self) -> Result<Box<dyn PageDriver>, BrowserError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;

        let params = SetUserAgentOverrideParams::builder()
            .user_agent(self.user_agent.clone())
            .accept_language(self.locale.clone())
            .build()
            .map_err(BrowserError::Protocol)?;
        page.execute(params)
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;

        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        let mut this = *self;

        let closed = this
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Protocol(e.to_string()));

        if let Err(e) = this.browser.wait().await {
            tracing::debug!(error = %e, "Waiting for Chromium exit failed");
        }

        if tokio::time::timeout(HANDLER_SHUTDOWN_GRACE, &mut this.handler_task)
            .await
            .is_err()
        {
            this.handler_task.abort();
        }

        closed
    }
}

struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    async fn evaluate(&self, script: String) -> Result<EvaluationResult, BrowserError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, BrowserError> {
        self.evaluate(script)
            .await?
            .into_value::<T>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }
}

/// String result of an evaluation; `null` and missing values are `None`
fn optional_text(result: &EvaluationResult) -> Option<String> {
    match result.value() {
        Some(Value::String(text)) => Some(text.clone()),
        _ => None,
    }
}

/// JS expression yielding the frame's document, or null if inaccessible
fn frame_document(frame: &FrameRef) -> String {
    if frame.is_top_level() {
        "document".to_string()
    } else {
        format!(
            "(() => {{ {FRAME_WALK} try {{ const win = walk(window, [])[{}]; return win ? win.document : null; }} catch (e) {{ return null; }} }})()",
            frame.index
        )
    }
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Protocol(e.to_string()))
    }

    async fn frames(&self) -> Result<Vec<FrameRef>, BrowserError> {
        let script = format!(
            "(() => {{ {FRAME_WALK} return walk(window, []).map(win => {{ try {{ return win.location.href; }} catch (e) {{ return ''; }} }}); }})()"
        );

        let urls: Vec<String> = self.eval(script).await?;
        Ok(urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| FrameRef { index, url })
            .collect())
    }

    async fn inner_text(
        &self,
        frame: &FrameRef,
        selector: &str,
    ) -> Result<Option<String>, BrowserError> {
        let script = format!(
            "(() => {{ const doc = {}; if (!doc) return null; const el = doc.querySelector({}); return el ? el.innerText : null; }})()",
            frame_document(frame),
            js_string(selector)
        );
        Ok(optional_text(&self.evaluate(script).await?))
    }

    async fn inner_texts(
        &self,
        frame: &FrameRef,
        selector: &str,
    ) -> Result<Vec<String>, BrowserError> {
        let script = format!(
            "(() => {{ const doc = {}; if (!doc) return []; return Array.from(doc.querySelectorAll({})).map(el => el.innerText || ''); }})()",
            frame_document(frame),
            js_string(selector)
        );
        self.eval(script).await
    }

    async fn wait_for_selector(
        &self,
        frame: &FrameRef,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, BrowserError> {
        let script = format!(
            "(() => {{ const doc = {}; return !!(doc && doc.querySelector({})); }})()",
            frame_document(frame),
            js_string(selector)
        );

        let deadline = Instant::now() + timeout;
        loop {
            if self.eval::<bool>(script.clone()).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }
}

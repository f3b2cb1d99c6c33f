//! Single active scrape session
//!
//! At most one scrape runs at a time. Starting a new one stops the current run
//! and waits (bounded) for it to finish, so the old stream's terminal event
//! always precedes the new stream's items. Control calls are routed to the
//! current run's [`ControlGate`].

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

use crate::crawler::gate::ControlGate;
use crate::crawler::pipeline::{PipelineEvent, ScrapePipeline};
use crate::error::ScraperErrorTrait;
use crate::models::{PostDetail, ScrapeRequest};
use crate::utils::error::SessionError;

/// How long a new session waits for the one it replaces
pub const DEFAULT_SUPERSEDE_TIMEOUT: Duration = Duration::from_secs(30);

/// Event delivered to a session's consumer
///
/// A stream ends with exactly one of `Done`, `Stopped` or `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Total(u64),
    Item(PostDetail),
    Done,
    Stopped,
    Error(String),
}

impl SessionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Stopped | Self::Error(_))
    }
}

/// Snapshot of the registry state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub active: bool,
    pub session_id: Option<u64>,
    pub paused: bool,
    pub stop_requested: bool,
}

struct ActiveSession {
    id: u64,
    gate: Arc<ControlGate>,
    finished: watch::Receiver<bool>,
}

/// Registry owning the current session
pub struct SessionRegistry {
    pipeline: Arc<ScrapePipeline>,
    current: Mutex<Option<ActiveSession>>,
    next_id: AtomicU64,
    supersede_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(pipeline: Arc<ScrapePipeline>) -> Self {
        Self {
            pipeline,
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
            supersede_timeout: DEFAULT_SUPERSEDE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_supersede_timeout(mut self, timeout: Duration) -> Self {
        self.supersede_timeout = timeout;
        self
    }

    pub fn pipeline(&self) -> &Arc<ScrapePipeline> {
        &self.pipeline
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a session, superseding any current one
    ///
    /// The new gate is installed immediately; the returned stream does no work
    /// until polled. Dropping the stream at any point releases the session.
    pub fn start_session(
        self: &Arc<Self>,
        request: ScrapeRequest,
    ) -> impl Stream<Item = SessionEvent> + Send + 'static {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let gate = Arc::new(ControlGate::new());
        let (finished_tx, finished_rx) = watch::channel(false);

        let previous = self.lock().replace(ActiveSession {
            id,
            gate: Arc::clone(&gate),
            finished: finished_rx,
        });

        if let Some(previous) = &previous {
            tracing::info!(previous = previous.id, session = id, "Superseding active session");
            previous.gate.request_stop();
            previous.gate.resume();
        }

        let cleanup = SessionCleanup {
            registry: Arc::clone(self),
            id,
            finished: finished_tx,
        };
        let registry = Arc::clone(self);

        stream! {
            let _cleanup = cleanup;

            if let Some(previous) = previous {
                let mut finished = previous.finished;
                let timed_out = tokio::time::timeout(
                    registry.supersede_timeout,
                    finished.wait_for(|done| *done),
                )
                .await
                .is_err();
                if timed_out {
                    tracing::warn!(previous = previous.id, session = id, "Superseded session did not finish in time");
                }
            }

            tracing::info!(session = id, keyword = %request.keyword, "Session started");

            let events = Arc::clone(&registry.pipeline).run(request, Arc::clone(&gate));
            futures::pin_mut!(events);

            let mut failure = None;
            while let Some(event) = events.next().await {
                match event {
                    Ok(PipelineEvent::Total(total)) => {
                        yield SessionEvent::Total(total);
                    }
                    Ok(PipelineEvent::Item(detail)) => {
                        yield SessionEvent::Item(detail);
                    }
                    Err(e) => {
                        tracing::error!(
                            session = id,
                            error = %e,
                            category = ?e.category(),
                            recoverable = e.is_recoverable(),
                            "Scrape run failed"
                        );
                        failure = Some(e.localized_desc());
                        break;
                    }
                }
            }

            match failure {
                Some(message) => {
                    yield SessionEvent::Error(message);
                }
                None if gate.is_stop_requested() => {
                    tracing::info!(session = id, "Session stopped");
                    yield SessionEvent::Stopped;
                }
                None => {
                    tracing::info!(session = id, "Session completed");
                    yield SessionEvent::Done;
                }
            }
        }
    }

    fn current_gate(&self) -> Result<Arc<ControlGate>, SessionError> {
        self.lock()
            .as_ref()
            .map(|session| Arc::clone(&session.gate))
            .ok_or(SessionError::NoActiveSession)
    }

    /// Pause the current session
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` when nothing is running
    pub fn pause(&self) -> Result<(), SessionError> {
        self.current_gate()?.pause();
        Ok(())
    }

    /// Resume the current session
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` when nothing is running
    pub fn resume(&self) -> Result<(), SessionError> {
        self.current_gate()?.resume();
        Ok(())
    }

    /// Stop the current session; a paused session is released first
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` when nothing is running
    pub fn stop(&self) -> Result<(), SessionError> {
        self.current_gate()?.request_stop();
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    pub fn status(&self) -> SessionStatus {
        match self.lock().as_ref() {
            Some(session) => SessionStatus {
                active: true,
                session_id: Some(session.id),
                paused: session.gate.is_paused(),
                stop_requested: session.gate.is_stop_requested(),
            },
            None => SessionStatus::default(),
        }
    }
}

/// Releases a session when its stream ends or is dropped
struct SessionCleanup {
    registry: Arc<SessionRegistry>,
    id: u64,
    finished: watch::Sender<bool>,
}

impl Drop for SessionCleanup {
    fn drop(&mut self) {
        {
            let mut current = self.registry.lock();
            // A superseded session must not clear its successor
            if current.as_ref().is_some_and(|session| session.id == self.id) {
                *current = None;
            }
        }
        self.finished.send_replace(true);
        tracing::debug!(session = self.id, "Session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::browser::{BrowserLauncher, SnapshotLauncher};
    use crate::crawler::detail::DetailFetcher;
    use crate::crawler::search::SearchClient;
    use crate::crawler::selectors::SelectorSet;
    use crate::config::BrowserConfig;
    use crate::models::{ContentMode, FieldSelection};

    fn registry() -> Arc<SessionRegistry> {
        let search = SearchClient::with_endpoint("http://127.0.0.1:9/unreachable").unwrap();
        let launcher: Arc<dyn BrowserLauncher> = Arc::new(SnapshotLauncher::default());
        let fetcher = DetailFetcher::new(SelectorSet::default(), &BrowserConfig::default());
        Arc::new(SessionRegistry::new(Arc::new(ScrapePipeline::new(search, launcher, fetcher))))
    }

    fn request() -> ScrapeRequest {
        ScrapeRequest::new(
            "test",
            "2024-01-01",
            "2024-01-31",
            FieldSelection::parse("url"),
            ContentMode::Preview,
        )
        .unwrap()
    }

    #[test]
    fn test_controls_without_session() {
        let registry = registry();
        assert_eq!(registry.pause(), Err(SessionError::NoActiveSession));
        assert_eq!(registry.resume(), Err(SessionError::NoActiveSession));
        assert_eq!(registry.stop(), Err(SessionError::NoActiveSession));
        assert_eq!(registry.status(), SessionStatus::default());
    }

    #[tokio::test]
    async fn test_dropping_unpolled_stream_releases_session() {
        let registry = registry();
        let stream = registry.start_session(request());
        assert!(registry.is_active());
        assert!(registry.pause().is_ok());
        assert!(registry.status().paused);

        drop(stream);
        assert!(!registry.is_active());
        assert_eq!(registry.stop(), Err(SessionError::NoActiveSession));
    }

    #[tokio::test]
    async fn test_superseded_cleanup_keeps_successor() {
        let registry = registry();
        let first = registry.start_session(request());
        let second = registry.start_session(request());

        drop(first);
        let status = registry.status();
        assert!(status.active);
        assert_eq!(status.session_id, Some(2));

        drop(second);
        assert!(!registry.is_active());
    }

    #[tokio::test]
    async fn test_upstream_failure_ends_with_error() {
        let registry = registry();
        let events: Vec<SessionEvent> = registry.start_session(request()).collect().await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SessionEvent::Error(_)));
        assert!(!registry.is_active());
    }
}

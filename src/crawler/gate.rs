//! Cooperative pause/stop control
//!
//! The pipeline consults a [`ControlGate`] between items. Control calls from
//! other tasks only flip atomic flags and wake paused waiters, so they never
//! block on the pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Outcome of a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Continue,
    Stop,
}

/// Pause/stop flags shared between a run and its controllers
#[derive(Debug)]
pub struct ControlGate {
    running: AtomicBool,
    stop_requested: AtomicBool,
    wake: Notify,
}

impl Default for ControlGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlGate {
    /// Running, no stop requested
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            stop_requested: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    /// Hold the run at its next checkpoint
    pub fn pause(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("Scrape paused");
        }
    }

    /// Release a paused run
    pub fn resume(&self) {
        if !self.running.swap(true, Ordering::SeqCst) {
            tracing::info!("Scrape resumed");
        }
        self.wake.notify_waiters();
    }

    /// Ask the run to stop; also releases a paused run
    pub fn request_stop(&self) {
        if !self.stop_requested.swap(true, Ordering::SeqCst) {
            tracing::info!("Scrape stop requested");
        }
        self.running.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Wait `delay`, then hold while paused
    ///
    /// A stop requested before the call returns [`Checkpoint::Stop`] without
    /// waiting. The paused wait has no timeout.
    pub async fn checkpoint(&self, delay: Duration) -> Checkpoint {
        if self.is_stop_requested() {
            return Checkpoint::Stop;
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.is_stop_requested() {
            return Checkpoint::Stop;
        }

        self.wait_while_paused().await;

        if self.is_stop_requested() {
            Checkpoint::Stop
        } else {
            Checkpoint::Continue
        }
    }

    async fn wait_while_paused(&self) {
        loop {
            // Register before checking the flag so a resume in between is not lost
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.running.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

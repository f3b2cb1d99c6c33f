//! Error types for the blog scraper
//!
//! This module defines the domain error types used throughout the application.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by the remote search endpoint
///
/// Any of these aborts the current scrape run.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timeout
    #[error("Search request timed out")]
    Timeout,

    /// Non-success status code
    #[error("Search endpoint returned status {0}")]
    Status(u16),

    /// Payload could not be parsed after stripping the guard prefix
    #[error("Malformed search payload: {0}")]
    MalformedPayload(String),
}

/// Errors raised by a browser driver
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Browser process could not be started
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// DevTools protocol command failed
    #[error("Browser protocol error: {0}")]
    Protocol(String),

    /// In-page script evaluation failed or returned an unexpected value
    #[error("Script evaluation failed: {0}")]
    Script(String),

    /// Invalid CSS selector
    #[error("Invalid selector: {0}")]
    Selector(String),

    /// Session or page was already closed
    #[error("Browser session closed")]
    Closed,
}

/// Per-item extraction failures
///
/// These never abort a run; the detail fetcher turns them into sentinel values.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Page did not finish loading in time
    #[error("Navigation to {url} timed out after {}ms", .timeout.as_millis())]
    NavigationTimeout { url: String, timeout: Duration },

    /// Browser failure while loading or inspecting the page
    #[error("{0}")]
    Browser(#[from] BrowserError),
}

/// Session control errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Control call arrived while nothing is running
    #[error("No active scrape session")]
    NoActiveSession,
}

/// Spreadsheet export errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// Workbook writer failure
    #[error("Workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

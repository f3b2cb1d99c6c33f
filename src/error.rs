//! Unified error handling for the scraper crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while keeping the domain errors usable on
//! their own.
//!
//! # Architecture
//!
//! - [`ScraperErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use naver_blog_scraper::error::{Error, ScraperErrorTrait};
//!
//! fn report(err: &Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(error = %err, "retrying");
//!     } else {
//!         eprintln!("{}", err.localized_desc());
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::utils::error::{
    BrowserError, ExportError, ExtractionError, SessionError, UpstreamError,
};

/// Common trait for all scraper error types
pub trait ScraperErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Korean description for user-facing messages
    fn localized_desc(&self) -> String;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Search endpoint and transport errors
    Network,
    /// Browser driving and page extraction errors
    Browser,
    /// Session control conflicts
    Session,
    /// Request validation errors
    Validation,
    /// Export and I/O errors
    Storage,
    /// Other/unknown errors
    Other,
}

impl ScraperErrorTrait for UpstreamError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::Status(code) => matches!(code, 429 | 500 | 502 | 503 | 504),
            Self::MalformedPayload(_) => false,
        }
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Http(e) => format!("검색 요청 실패: {e}"),
            Self::Timeout => "검색 요청 시간 초과".to_string(),
            Self::Status(code) => format!("검색 서버 응답 오류 ({code})"),
            Self::MalformedPayload(msg) => format!("검색 응답 파싱 실패: {msg}"),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }
}

impl ScraperErrorTrait for BrowserError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Launch(_) | Self::Closed)
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Launch(msg) => format!("브라우저 실행 실패: {msg}"),
            Self::Protocol(msg) | Self::Script(msg) => format!("브라우저 오류: {msg}"),
            Self::Selector(sel) => format!("잘못된 셀렉터: {sel}"),
            Self::Closed => "브라우저 세션이 종료되었습니다".to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Browser
    }
}

impl ScraperErrorTrait for ExtractionError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::NavigationTimeout { .. } => true,
            Self::Browser(e) => e.is_recoverable(),
        }
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::NavigationTimeout { .. } => "페이지 로드 시간 초과".to_string(),
            Self::Browser(e) => e.localized_desc(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Browser
    }
}

impl ScraperErrorTrait for SessionError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::NoActiveSession => "활성 스크래핑 세션이 없습니다".to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Session
    }
}

impl ScraperErrorTrait for ExportError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Xlsx(e) => format!("엑셀 생성 실패: {e}"),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

/// Unified error type for the scraper crate
#[derive(Error, Debug)]
pub enum Error {
    /// Search endpoint errors
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Browser errors outside per-item extraction (launch, page creation)
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Per-item extraction errors
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Session control errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Spreadsheet export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Invalid scrape request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScraperErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Upstream(e) => e.is_recoverable(),
            Self::Browser(e) => e.is_recoverable(),
            Self::Extraction(e) => e.is_recoverable(),
            Self::Session(e) => e.is_recoverable(),
            Self::Export(_) => false,
            Self::InvalidRequest(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
        }
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Upstream(e) => e.localized_desc(),
            Self::Browser(e) => e.localized_desc(),
            Self::Extraction(e) => e.localized_desc(),
            Self::Session(e) => e.localized_desc(),
            Self::Export(e) => e.localized_desc(),
            Self::InvalidRequest(msg) => msg.clone(),
            Self::Io(e) => format!("입출력 오류: {e}"),
            Self::Json(e) => format!("JSON 오류: {e}"),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Upstream(_) => ErrorCategory::Network,
            Self::Browser(_) | Self::Extraction(_) => ErrorCategory::Browser,
            Self::Session(_) => ErrorCategory::Session,
            Self::InvalidRequest(_) => ErrorCategory::Validation,
            Self::Export(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

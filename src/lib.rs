//! naver-blog-scraper - Naver Blog search scraper
//!
//! Lists blog posts for a keyword and date range through the Naver Blog
//! search endpoint, optionally loads each post in a headless browser for body
//! text, likes and comments, and streams results one at a time under
//! pause/resume/stop control.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Search client, browser drivers, detail extraction, pipeline
//! - [`session`] - Single active session registry
//! - [`server`] - HTTP API with server-sent events
//! - [`export`] - Spreadsheet export
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use naver_blog_scraper::config::Config;
//! use naver_blog_scraper::crawler::SearchClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = SearchClient::new(&config.search)?;
//!     let total = client.count("맛집", "2024-01-01", "2024-01-31").await?;
//!     println!("{total} posts");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod export;
pub mod models;
pub mod server;
pub mod session;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::{ControlGate, PipelineEvent, ScrapePipeline, SearchClient};
    pub use crate::error::{Error, ErrorCategory, Result, ScraperErrorTrait};
    pub use crate::models::{ContentMode, Field, FieldSelection, PostDetail, PostMeta, ScrapeRequest};
    pub use crate::session::{SessionEvent, SessionRegistry};
}

// Direct re-exports for convenience
pub use error::{Error, Result};
pub use models::{ContentMode, Field, FieldSelection, PostDetail, PostMeta, ScrapeRequest};

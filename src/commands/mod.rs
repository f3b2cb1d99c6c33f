pub mod inspect;
pub mod scrape;
pub mod serve;

// Re-export command functions for convenience
pub use inspect::inspect;
pub use scrape::{count, scrape, ScrapeParams};
pub use serve::serve;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use naver_blog_scraper::config::Config;
use naver_blog_scraper::crawler::ScrapePipeline;
use naver_blog_scraper::session::SessionRegistry;

/// Production session registry for the given configuration
fn build_registry(config: &Config) -> Result<Arc<SessionRegistry>> {
    let pipeline = Arc::new(ScrapePipeline::from_config(config)?);
    let registry = SessionRegistry::new(pipeline)
        .with_supersede_timeout(Duration::from_secs(config.pipeline.supersede_timeout_secs));
    Ok(Arc::new(registry))
}

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;

use naver_blog_scraper::config::Config;
use naver_blog_scraper::crawler::SearchClient;
use naver_blog_scraper::export;
use naver_blog_scraper::models::{ContentMode, FieldSelection, ScrapeRequest};
use naver_blog_scraper::session::{SessionEvent, SessionRegistry};

/// Arguments of the scrape command
pub struct ScrapeParams {
    pub keyword: String,
    pub start: String,
    pub end: String,
    pub fields: String,
    pub content_mode: String,
    pub output: Option<PathBuf>,
}

/// Print the number of matching posts
pub async fn count(config: &Config, keyword: &str, start: &str, end: &str) -> Result<()> {
    let request = ScrapeRequest::new(
        keyword,
        start,
        end,
        FieldSelection::All,
        ContentMode::Preview,
    )?;
    let client = SearchClient::new(&config.search)?;

    let total = client
        .count(&request.keyword, &request.start_date, &request.end_date)
        .await?;

    println!("{total}");
    Ok(())
}

/// Scrape and print one JSON record per line
///
/// Ctrl-C requests a cooperative stop; records gathered so far are still
/// exported.
pub async fn scrape(config: Config, params: ScrapeParams) -> Result<()> {
    let request = ScrapeRequest::new(
        &params.keyword,
        &params.start,
        &params.end,
        FieldSelection::parse(&params.fields),
        ContentMode::parse_or_default(&params.content_mode),
    )?;
    let fields = request.active_fields();

    let registry = super::build_registry(&config)?;
    let interrupt = spawn_interrupt_handler(Arc::clone(&registry));

    let events = registry.start_session(request);
    futures::pin_mut!(events);

    let mut records = Vec::new();
    let mut failure = None;

    while let Some(event) = events.next().await {
        match event {
            SessionEvent::Total(total) => tracing::info!(total, "Posts found"),
            SessionEvent::Item(detail) => {
                let record = detail.to_record(&fields);
                println!("{}", serde_json::Value::Object(record.clone()));
                records.push(record);
            }
            SessionEvent::Done => tracing::info!(count = records.len(), "Scrape complete"),
            SessionEvent::Stopped => tracing::info!(count = records.len(), "Scrape stopped"),
            SessionEvent::Error(message) => failure = Some(message),
        }
    }
    interrupt.abort();

    if let Some(path) = &params.output {
        export::save_xlsx(path, &records, &fields)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Saved {} records to {}", records.len(), path.display());
    }

    if let Some(message) = failure {
        bail!("Scrape failed: {message}");
    }
    Ok(())
}

fn spawn_interrupt_handler(registry: Arc<SessionRegistry>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current post");
            let _ = registry.stop();
        }
    })
}

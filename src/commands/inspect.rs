use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use naver_blog_scraper::config::Config;
use naver_blog_scraper::crawler::browser::snapshot::{SnapshotDocument, SnapshotLauncher};
use naver_blog_scraper::crawler::browser::{BrowserLauncher, SessionGuard};
use naver_blog_scraper::crawler::DetailFetcher;
use naver_blog_scraper::models::{ContentMode, FieldSelection, PostMeta};

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Run the configured selectors over saved HTML and print the result
pub async fn inspect(
    config: &Config,
    page: &Path,
    frames: &[std::path::PathBuf],
    fields: &str,
    content_mode: &str,
    verbose: bool,
) -> Result<()> {
    let html = tokio::fs::read_to_string(page)
        .await
        .with_context(|| format!("Failed to read {}", page.display()))?;

    let mut document = SnapshotDocument::new(html);
    for frame in frames {
        let frame_html = tokio::fs::read_to_string(frame)
            .await
            .with_context(|| format!("Failed to read {}", frame.display()))?;
        document = document.with_frame(file_url(frame), frame_html);
    }

    let url = file_url(page);
    let launcher = SnapshotLauncher::new(HashMap::from([(url.clone(), document)]));
    let site = launcher.site();

    let fetcher = DetailFetcher::new(config.selectors.clone(), &config.browser).with_timings(
        Duration::from_millis(config.browser.navigation_timeout_ms),
        Duration::ZERO,
        Duration::ZERO,
    );

    let fields = FieldSelection::parse(fields);
    let mode = ContentMode::parse_or_default(content_mode);
    let meta = PostMeta {
        url,
        title: page
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        ..PostMeta::default()
    };

    let mut guard = SessionGuard::new(launcher.launch().await?);
    let driver = guard.new_page().await?;
    let detail = fetcher.fetch_detail(driver.as_ref(), &meta, &fields, mode).await;
    drop(driver);
    guard.close().await;

    let record = detail.to_record(&fields.active_fields(mode));
    println!("{}", serde_json::to_string_pretty(&record)?);

    if verbose {
        eprintln!("Selectors tried:");
        for selector in site.queries() {
            eprintln!("  {selector}");
        }
    }

    Ok(())
}

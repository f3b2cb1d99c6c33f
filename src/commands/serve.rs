use anyhow::{Context, Result};

use naver_blog_scraper::config::Config;
use naver_blog_scraper::server::ScraperServer;

/// Run the HTTP API until Ctrl-C
pub async fn serve(config: Config) -> Result<()> {
    let registry = super::build_registry(&config)?;
    let server = ScraperServer::new(config.server.clone(), registry);

    server
        .start_with_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

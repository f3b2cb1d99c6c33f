//! HTTP server
//!
//! Serves the scrape API: counting, the live scrape event stream, session
//! control and spreadsheet export.

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::session::SessionRegistry;

pub use api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Current scrape session
    pub registry: Arc<SessionRegistry>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// Scrape API server
pub struct ScraperServer {
    config: ServerConfig,
    state: AppState,
}

impl ScraperServer {
    pub fn new(config: ServerConfig, registry: Arc<SessionRegistry>) -> Self {
        Self {
            config,
            state: AppState::new(registry),
        }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    fn bind_address(&self) -> Result<SocketAddr, ServerError> {
        self.config
            .bind_address()
            .map_err(|e| ServerError::Config(format!("{e:#}")))
    }

    /// Serve until `shutdown_signal` resolves
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.bind_address()?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        tracing::info!(%addr, "Scraper server listening");

        // Open event streams keep connections alive, so stop the active
        // session first to let them end
        let registry = Arc::clone(&self.state.registry);
        let shutdown = async move {
            shutdown_signal.await;
            if registry.stop().is_ok() {
                tracing::info!("Stopping active session for shutdown");
            }
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("Scraper server shutdown complete");
        Ok(())
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Error, Debug, Clone)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to bind: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crawler::browser::{BrowserLauncher, SnapshotLauncher};
    use crate::crawler::{DetailFetcher, ScrapePipeline, SearchClient, SelectorSet};

    fn registry() -> Arc<SessionRegistry> {
        let config = Config::default();
        let search = SearchClient::with_endpoint("http://127.0.0.1:9/").unwrap();
        let launcher: Arc<dyn BrowserLauncher> = Arc::new(SnapshotLauncher::default());
        let fetcher = DetailFetcher::new(SelectorSet::default(), &config.browser);
        Arc::new(SessionRegistry::new(Arc::new(ScrapePipeline::new(search, launcher, fetcher))))
    }

    #[test]
    fn test_bind_address() {
        let server = ScraperServer::new(ServerConfig::default(), registry());
        assert_eq!(server.bind_address().unwrap().port(), 8000);

        let bad = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        let server = ScraperServer::new(bad, registry());
        assert!(matches!(server.bind_address(), Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn test_state_starts_idle() {
        let server = ScraperServer::new(ServerConfig::default(), registry());
        assert!(!server.state().registry.is_active());
    }
}

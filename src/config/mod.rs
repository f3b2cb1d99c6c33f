//! Configuration management for the blog scraper
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crawler::selectors::SelectorSet;

/// Browser-like user agent sent to both the search endpoint and Chromium
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Search endpoint configuration
    pub search: SearchConfig,

    /// Headless browser configuration
    pub browser: BrowserConfig,

    /// Pipeline pacing and session configuration
    pub pipeline: PipelineConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Post page selectors
    pub selectors: SelectorSet,
}

/// Search API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search endpoint URL
    pub endpoint: String,

    /// Results per page (the endpoint serves 7)
    pub page_size: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Jitter between page requests
    pub page_delay: DelayRange,

    /// User agent string
    pub user_agent: String,

    /// Referer header
    pub referer: String,

    /// Accept-Language header
    pub accept_language: String,
}

/// Headless browser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Chromium executable; auto-detected when unset
    pub executable: Option<PathBuf>,

    /// Run without a visible window
    pub headless: bool,

    /// Pass `--no-sandbox` (needed in most containers)
    pub no_sandbox: bool,

    /// User agent override
    pub user_agent: String,

    /// Browser locale
    pub locale: String,

    /// Page navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,

    /// Wait after navigation for the post iframe to attach, in milliseconds
    pub frame_settle_ms: u64,

    /// Best-effort wait for reaction widgets, in milliseconds
    pub reaction_wait_ms: u64,
}

/// Pipeline pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Jitter between posts when a browser is used
    pub browser_item_delay: DelayRange,

    /// Jitter between posts in metadata-only mode
    pub metadata_item_delay: DelayRange,

    /// How long a new session waits for the run it superseded to wind down
    pub supersede_timeout_secs: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Allow cross-origin requests
    pub enable_cors: bool,

    /// Trace every HTTP request
    pub enable_request_logging: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

/// Randomized delay bounds in milliseconds (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// No delay at all
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Draw a delay uniformly from the range
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("https://section.blog.naver.com/ajax/SearchList.naver"),
            page_size: 7,
            request_timeout_secs: 15,
            page_delay: DelayRange::new(300, 800),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: String::from("https://section.blog.naver.com/"),
            accept_language: String::from("ko-KR,ko;q=0.9,en;q=0.8"),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            no_sandbox: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            locale: String::from("ko-KR"),
            navigation_timeout_ms: 20_000,
            frame_settle_ms: 2_000,
            reaction_wait_ms: 5_000,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            browser_item_delay: DelayRange::new(800, 1500),
            metadata_item_delay: DelayRange::new(50, 150),
            supersede_timeout_secs: 30,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 8000,
            enable_cors: false,
            enable_request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid server host: {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("NBS_SEARCH_ENDPOINT") {
            config.search.endpoint = endpoint;
        }

        if let Some(timeout) = std::env::var("NBS_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.search.request_timeout_secs = timeout;
        }

        if let Ok(path) = std::env::var("NBS_CHROME_PATH") {
            config.browser.executable = Some(PathBuf::from(path));
        }

        if let Some(headless) = std::env::var("NBS_HEADLESS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
        {
            config.browser.headless = headless;
        }

        if let Some(no_sandbox) = std::env::var("NBS_NO_SANDBOX")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
        {
            config.browser.no_sandbox = no_sandbox;
        }

        if let Some(timeout) = std::env::var("NBS_NAVIGATION_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.browser.navigation_timeout_ms = timeout;
        }

        if let Ok(host) = std::env::var("NBS_HOST") {
            config.server.host = host;
        }

        if let Some(port) = std::env::var("NBS_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
        {
            config.server.port = port;
        }

        if let Ok(level) = std::env::var("NBS_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(format) = std::env::var("NBS_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.search.page_size == 0 {
            anyhow::bail!("search.page_size must be greater than 0");
        }

        if self.search.request_timeout_secs == 0 {
            anyhow::bail!("search.request_timeout_secs must be greater than 0");
        }

        if self.browser.navigation_timeout_ms == 0 {
            anyhow::bail!("browser.navigation_timeout_ms must be greater than 0");
        }

        for (name, range) in [
            ("search.page_delay", self.search.page_delay),
            ("pipeline.browser_item_delay", self.pipeline.browser_item_delay),
            ("pipeline.metadata_item_delay", self.pipeline.metadata_item_delay),
        ] {
            if range.min_ms > range.max_ms {
                anyhow::bail!("{name}: min_ms must not exceed max_ms");
            }
        }

        if self.selectors.content.is_empty() {
            anyhow::bail!("selectors.content must list at least one container");
        }

        self.server.bind_address()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_page_size() {
        let mut config = Config::default();
        config.search.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_delay_range() {
        let mut config = Config::default();
        config.pipeline.browser_item_delay = DelayRange::new(500, 100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_delay_sample_bounds() {
        let range = DelayRange::new(800, 1500);
        for _ in 0..100 {
            let d = range.sample();
            assert!(d >= Duration::from_millis(800) && d <= Duration::from_millis(1500));
        }
        assert_eq!(DelayRange::zero().sample(), Duration::ZERO);
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[pipeline]
browser_item_delay = {{ min_ms = 10, max_ms = 20 }}
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.pipeline.browser_item_delay, DelayRange::new(10, 20));
        assert_eq!(config.pipeline.metadata_item_delay, DelayRange::new(50, 150));
        assert_eq!(config.search.page_size, 7);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("NBS_PORT", "9300");
        std::env::set_var("NBS_HEADLESS", "false");
        let config = Config::from_env().unwrap();
        std::env::remove_var("NBS_PORT");
        std::env::remove_var("NBS_HEADLESS");

        assert_eq!(config.server.port, 9300);
        assert!(!config.browser.headless);
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_garbage() {
        std::env::set_var("NBS_PORT", "not-a-port");
        let config = Config::from_env().unwrap();
        std::env::remove_var("NBS_PORT");

        assert_eq!(config.server.port, 8000);
    }
}

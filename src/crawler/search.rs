//! Naver Blog search API client
//!
//! The section search endpoint returns JSON guarded by the `)]}',` prefix used
//! against JSON hijacking. Results are paginated at a fixed page size and
//! ordered most-recent-first.

use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;

use crate::config::{DelayRange, SearchConfig};
use crate::crawler::headers::build_search_headers;
use crate::models::PostMeta;
use crate::utils::error::UpstreamError;
use crate::utils::{format_timestamp, strip_html};

/// Anti-hijacking guard in front of every payload
static GUARD_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\)\]\}',?\s*\n?").expect("Invalid regex pattern"));

// ============================================================================
// API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: SearchResult,
}

/// Result block of one search page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Total hits for the query (not just this page)
    pub total_count: u64,

    /// Items on this page
    #[serde(default)]
    pub search_list: Vec<SearchItem>,
}

/// Raw search item
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub post_url: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub nick_name: Option<String>,

    #[serde(default)]
    pub blog_name: Option<String>,

    /// Milliseconds since epoch
    #[serde(default)]
    pub add_date: Option<i64>,

    #[serde(default)]
    pub domain_id_or_blog_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub log_no: u64,

    #[serde(default)]
    pub contents: Option<String>,
}

impl From<SearchItem> for PostMeta {
    fn from(item: SearchItem) -> Self {
        Self {
            url: item.post_url,
            title: strip_html(item.title.as_deref().unwrap_or_default()),
            author: item.nick_name.unwrap_or_default(),
            blog_name: item.blog_name.unwrap_or_default(),
            date: format_timestamp(item.add_date.unwrap_or(0)),
            blog_id: item.domain_id_or_blog_id.unwrap_or_default(),
            log_no: item.log_no,
            snippet: strip_html(item.contents.as_deref().unwrap_or_default()),
        }
    }
}

/// Accept `logNo` as a number, a numeric string or null
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n.as_u64().unwrap_or(0)),
        Value::String(s) => Ok(s.trim().parse().unwrap_or(0)),
        _ => Ok(0),
    }
}

/// Strip the guard prefix and parse a search payload
///
/// # Errors
///
/// Returns `UpstreamError::MalformedPayload` if the remaining text is not the
/// expected JSON shape.
pub fn parse_search_payload(text: &str) -> Result<SearchResult, UpstreamError> {
    let cleaned = GUARD_PREFIX.replace(text, "");
    let response: SearchResponse = serde_json::from_str(&cleaned)
        .map_err(|e| UpstreamError::MalformedPayload(e.to_string()))?;
    Ok(response.result)
}

// ============================================================================
// Client
// ============================================================================

/// Paginated client for the blog search endpoint
pub struct SearchClient {
    client: Client,
    endpoint: String,
    headers: HeaderMap,
    page_size: u32,
    page_delay: DelayRange,
}

impl SearchClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::Http` if the HTTP client cannot be created
    pub fn new(config: &SearchConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            headers: build_search_headers(
                &config.user_agent,
                &config.referer,
                &config.accept_language,
            ),
            page_size: config.page_size.max(1),
            page_delay: config.page_delay,
        })
    }

    /// Create a client against a custom endpoint with no inter-page delay
    ///
    /// Intended for mock servers.
    pub fn with_endpoint(endpoint: &str) -> Result<Self, UpstreamError> {
        let config = SearchConfig {
            endpoint: endpoint.to_string(),
            page_delay: DelayRange::zero(),
            ..SearchConfig::default()
        };
        Self::new(&config)
    }

    /// Results per page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of pages needed for `total` results
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.page_size))
    }

    /// Total number of posts matching the keyword in the date range
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` on transport failure, non-2xx status, or a
    /// malformed payload
    pub async fn count(
        &self,
        keyword: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<u64, UpstreamError> {
        let result = self.request_page(keyword, start_date, end_date, 1).await?;
        tracing::debug!(keyword, start_date, end_date, total = result.total_count, "Counted posts");
        Ok(result.total_count)
    }

    /// Fetch every post's metadata, in upstream order
    ///
    /// # Errors
    ///
    /// Returns the first `UpstreamError` encountered
    pub async fn fetch_all(
        &self,
        keyword: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<PostMeta>, UpstreamError> {
        let total = self.count(keyword, start_date, end_date).await?;
        self.fetch_pages(keyword, start_date, end_date, total).await
    }

    /// Fetch every page for an already known total
    ///
    /// Issues `ceil(total / page_size)` requests with a randomized delay
    /// between consecutive pages, stopping early at the first empty page.
    ///
    /// # Errors
    ///
    /// Returns the first `UpstreamError` encountered
    pub async fn fetch_pages(
        &self,
        keyword: &str,
        start_date: &str,
        end_date: &str,
        total: u64,
    ) -> Result<Vec<PostMeta>, UpstreamError> {
        let total_pages = self.total_pages(total);
        // The total is remote input; grow with the pages actually received
        let mut posts = Vec::new();

        for page in 1..=total_pages {
            let result = self.request_page(keyword, start_date, end_date, page).await?;
            let items = result.search_list.len();
            posts.extend(result.search_list.into_iter().map(PostMeta::from));

            tracing::debug!(page, total_pages, items, collected = posts.len(), "Fetched search page");

            if items == 0 {
                tracing::warn!(page, total, collected = posts.len(), "Empty search page before the reported total");
                break;
            }

            if page < total_pages {
                let delay = self.page_delay.sample();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        tracing::info!(keyword, total, pages = total_pages, collected = posts.len(), "Search listing complete");
        Ok(posts)
    }

    /// Request one page and parse it
    async fn request_page(
        &self,
        keyword: &str,
        start_date: &str,
        end_date: &str,
        page: u64,
    ) -> Result<SearchResult, UpstreamError> {
        let page_size = self.page_size.to_string();
        let current_page = page.to_string();
        let params = [
            ("countPerPage", page_size.as_str()),
            ("currentPage", current_page.as_str()),
            ("endDate", end_date),
            ("keyword", keyword),
            ("orderBy", "recentdate"),
            ("startDate", start_date),
            ("type", "post"),
        ];

        let response = self
            .client
            .get(&self.endpoint)
            .headers(self.headers.clone())
            .query(&params)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(page, status = status.as_u16(), "Search endpoint returned error status");
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let text = response.text().await.map_err(map_transport_error)?;
        parse_search_payload(&text)
    }
}

fn map_transport_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::Http(e)
    }
}

//! Common test utilities

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use naver_blog_scraper::config::{BrowserConfig, DelayRange};
use naver_blog_scraper::crawler::browser::snapshot::{SnapshotDocument, SnapshotLauncher};
use naver_blog_scraper::crawler::browser::BrowserLauncher;
use naver_blog_scraper::crawler::{DetailFetcher, ScrapePipeline, SearchClient, SelectorSet};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SEARCH_PATH: &str = "/ajax/SearchList.naver";
pub const PAGE_SIZE: u64 = 7;

/// URL of the n-th generated post (1-based)
pub fn post_url(n: u64) -> String {
    format!("https://blog.naver.com/tester/22300000{n:04}")
}

/// Search item JSON for the n-th generated post
pub fn search_item(n: u64) -> serde_json::Value {
    json!({
        "postUrl": post_url(n),
        "title": format!("<strong class=\"search_keyword\">맛집</strong> 후기 {n}"),
        "nickName": "tester",
        "blogName": "테스트 블로그",
        "addDate": 1_705_244_400_000_i64,
        "domainIdOrBlogId": "tester",
        "logNo": 223_000_000_000_u64 + n,
        "contents": format!("미리보기 {n}"),
    })
}

/// Guarded search payload, exactly as the endpoint sends it
pub fn search_payload(total: u64, items: &[serde_json::Value]) -> String {
    let body = json!({ "result": { "totalCount": total, "searchList": items } });
    format!(")]}}',\n{body}")
}

/// Mount one mock per result page for `total` generated posts
pub async fn mount_search(server: &MockServer, total: u64) {
    let pages = total.div_ceil(PAGE_SIZE).max(1);
    for page in 1..=pages {
        let first = (page - 1) * PAGE_SIZE + 1;
        let last = (page * PAGE_SIZE).min(total);
        let items: Vec<_> = (first..=last).map(search_item).collect();

        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(query_param("currentPage", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(search_payload(total, &items)))
            .mount(server)
            .await;
    }
}

/// Search client pointed at a mock server
pub fn search_client(server: &MockServer) -> SearchClient {
    SearchClient::with_endpoint(&format!("{}{SEARCH_PATH}", server.uri())).unwrap()
}

/// Post page with its `PostView` frame holding the given counters
pub fn post_document(n: u64, likes: u64, comments: u64) -> SnapshotDocument {
    SnapshotDocument::new("<html><body><iframe id=\"mainFrame\"></iframe></body></html>").with_frame(
        format!("https://blog.naver.com/PostView.naver?blogId=tester&logNo={n}"),
        format!(
            r#"<div class="se-main-container"><p>본문 {n}</p></div>
               <span class="u_likeit_list_count _count">{likes}</span>
               <em id="floating_bottom_commentCount">{comments}</em>"#
        ),
    )
}

/// Snapshot browser serving `total` generated posts
///
/// Post n has n likes and 2n comments.
pub fn snapshot_launcher(total: u64) -> SnapshotLauncher {
    let documents: HashMap<String, SnapshotDocument> = (1..=total)
        .map(|n| (post_url(n), post_document(n, n, n * 2)))
        .collect();
    SnapshotLauncher::new(documents)
}

/// Detail fetcher with no settle or reaction waits
pub fn fast_fetcher() -> DetailFetcher {
    DetailFetcher::new(SelectorSet::default(), &BrowserConfig::default()).with_timings(
        Duration::from_secs(2),
        Duration::ZERO,
        Duration::ZERO,
    )
}

/// Pipeline against a mock search server with the given item delay
pub fn pipeline(
    server: &MockServer,
    launcher: Arc<dyn BrowserLauncher>,
    item_delay: DelayRange,
) -> Arc<ScrapePipeline> {
    Arc::new(
        ScrapePipeline::new(search_client(server), launcher, fast_fetcher())
            .with_delays(item_delay, item_delay),
    )
}

//! Integration tests for SearchClient using wiremock

mod common;

use common::{mount_search, search_client, search_item, search_payload, SEARCH_PATH};
use naver_blog_scraper::utils::error::UpstreamError;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Count reads totalCount from the first page only
#[tokio::test]
async fn test_count() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("currentPage", "1"))
        .and(query_param("keyword", "맛집"))
        .and(query_param("startDate", "2024-01-01"))
        .and(query_param("endDate", "2024-01-31"))
        .and(query_param("orderBy", "recentdate"))
        .and(query_param("countPerPage", "7"))
        .and(header_exists("referer"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(search_payload(42, &[search_item(1)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = search_client(&mock_server);
    let total = client.count("맛집", "2024-01-01", "2024-01-31").await.unwrap();

    assert_eq!(total, 42);
}

/// fetch_all counts once and then walks every page in order
#[tokio::test]
async fn test_fetch_all_pages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("currentPage", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_payload(
            10,
            &(1..=7).map(search_item).collect::<Vec<_>>(),
        )))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("currentPage", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_payload(
            10,
            &(8..=10).map(search_item).collect::<Vec<_>>(),
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = search_client(&mock_server);
    let posts = client.fetch_all("맛집", "2024-01-01", "2024-01-31").await.unwrap();

    assert_eq!(posts.len(), 10);
    assert_eq!(posts[0].url, common::post_url(1));
    assert_eq!(posts[9].url, common::post_url(10));
    assert_eq!(posts[0].title, "맛집 후기 1");
    assert_eq!(posts[0].date, "2024.01.15");
    assert_eq!(posts[0].snippet, "미리보기 1");
}

/// A known total skips the count request
#[tokio::test]
async fn test_fetch_pages_with_known_total() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server, 15).await;

    let client = search_client(&mock_server);
    let posts = client
        .fetch_pages("맛집", "2024-01-01", "2024-01-31", 15)
        .await
        .unwrap();

    assert_eq!(posts.len(), 15);
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

/// Zero results means no page requests at all
#[tokio::test]
async fn test_fetch_all_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_payload(0, &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = search_client(&mock_server);
    let posts = client.fetch_all("없는키워드", "2024-01-01", "2024-01-31").await.unwrap();

    assert!(posts.is_empty());
}

/// Non-2xx responses surface as status errors
#[tokio::test]
async fn test_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = search_client(&mock_server);
    let err = client.count("맛집", "2024-01-01", "2024-01-31").await.unwrap_err();

    assert!(matches!(err, UpstreamError::Status(503)), "unexpected error: {err:?}");
}

/// HTML error pages are reported as malformed payloads
#[tokio::test]
async fn test_malformed_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>점검 중</html>"))
        .mount(&mock_server)
        .await;

    let client = search_client(&mock_server);
    let err = client.count("맛집", "2024-01-01", "2024-01-31").await.unwrap_err();

    assert!(matches!(err, UpstreamError::MalformedPayload(_)));
}

/// Payloads without the guard prefix are accepted as well
#[tokio::test]
async fn test_unguarded_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"result":{"totalCount":3,"searchList":[]}}"#),
        )
        .mount(&mock_server)
        .await;

    let client = search_client(&mock_server);
    let total = client.count("맛집", "2024-01-01", "2024-01-31").await.unwrap();

    assert_eq!(total, 3);
}

/// An inflated totalCount neither preallocates nor walks phantom pages
#[tokio::test]
async fn test_huge_total_with_empty_pages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("currentPage", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_payload(1 << 60, &[])))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("currentPage", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_payload(1 << 60, &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = search_client(&mock_server);
    let handle = tokio::spawn(async move {
        client.fetch_all("맛집", "2024-01-01", "2024-01-31").await
    });

    let posts = handle.await.expect("fetch_all must not panic").unwrap();
    assert!(posts.is_empty());
}

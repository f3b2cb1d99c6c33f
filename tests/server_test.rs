//! HTTP API tests driven through the router without a socket

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::{mount_search, pipeline, snapshot_launcher};
use naver_blog_scraper::config::{DelayRange, ServerConfig};
use naver_blog_scraper::export;
use naver_blog_scraper::server::ScraperServer;
use naver_blog_scraper::session::SessionRegistry;
use wiremock::MockServer;

async fn app(total: u64) -> (MockServer, Router) {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server, total).await;

    let pipeline = pipeline(&mock_server, Arc::new(snapshot_launcher(total)), DelayRange::zero());
    let registry = Arc::new(SessionRegistry::new(pipeline));
    let router = ScraperServer::new(ServerConfig::default(), registry).build_router();
    (mock_server, router)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (_server, router) = app(0).await;

    let response = router
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_count() {
    let (_server, router) = app(12).await;

    let response = router
        .oneshot(post_json(
            "/api/count",
            json!({ "keyword": "맛집", "startDate": "2024-01-01", "endDate": "2024-01-31" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["totalCount"], 12);
    assert_eq!(body["keyword"], "맛집");
}

#[tokio::test]
async fn test_count_rejects_missing_keyword() {
    let (_server, router) = app(0).await;

    let response = router
        .oneshot(post_json(
            "/api/count",
            json!({ "keyword": "  ", "startDate": "2024-01-01", "endDate": "2024-01-31" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("키워드"));
}

#[tokio::test]
async fn test_count_upstream_failure() {
    // Nothing mounted: the mock answers 404
    let mock_server = MockServer::start().await;
    let pipeline = pipeline(&mock_server, Arc::new(snapshot_launcher(0)), DelayRange::zero());
    let router = ScraperServer::new(ServerConfig::default(), Arc::new(SessionRegistry::new(pipeline)))
        .build_router();

    let response = router
        .oneshot(post_json(
            "/api/count",
            json!({ "keyword": "맛집", "startDate": "2024-01-01", "endDate": "2024-01-31" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("조회 중 오류가 발생했습니다"));
}

#[tokio::test]
async fn test_controls_conflict_when_idle() {
    let (_server, router) = app(0).await;

    for uri in ["/api/pause", "/api/resume", "/api/stop"] {
        let response = router
            .clone()
            .oneshot(Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT, "{uri}");
    }
}

#[tokio::test]
async fn test_scrape_event_stream() {
    let (_server, router) = app(3).await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/scrape?keyword=%EB%A7%9B%EC%A7%91&startDate=2024-01-01&endDate=2024-01-31&fields=url,date")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.contains("event: init\ndata: {\"total\":3}"), "{text}");
    assert!(text.contains("event: done"), "{text}");

    let items: Vec<Value> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter_map(|data| serde_json::from_str::<Value>(data).ok())
        .filter(|value| value.get("url").is_some())
        .collect();
    assert_eq!(items.len(), 3);
    assert!(items[0].get("date").is_some());
    assert!(items[0].get("likes").is_none());
}

#[tokio::test]
async fn test_scrape_rejects_bad_dates() {
    let (_server, router) = app(0).await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/scrape?keyword=test&startDate=2024-02-01&endDate=2024-01-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_excel() {
    let (_server, router) = app(0).await;

    let response = router
        .oneshot(post_json(
            "/api/export-excel",
            json!({
                "results": [{ "title": "제목", "url": "https://blog.naver.com/a/1", "likes": 3 }],
                "fields": ["url", "likes"],
                "contentMode": "none",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], export::CONTENT_TYPE);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains(export::FILE_NAME));

    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[..2], b"PK");
}

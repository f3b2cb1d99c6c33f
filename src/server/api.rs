//! REST and event-stream handlers
//!
//! | Route               | Method | Purpose                               |
//! |---------------------|--------|---------------------------------------|
//! | `/api/health`       | GET    | Liveness                              |
//! | `/api/status`       | GET    | Current session state                 |
//! | `/api/count`        | POST   | Number of posts for a query           |
//! | `/api/scrape`       | GET    | Scrape as server-sent events          |
//! | `/api/pause`        | POST   | Pause the current session             |
//! | `/api/resume`       | POST   | Resume the current session            |
//! | `/api/stop`         | POST   | Stop the current session              |
//! | `/api/export-excel` | POST   | Records to an `.xlsx` download        |
//!
//! Export columns are computed like scrape records, so `contentMode: "none"`
//! omits the content column even when no field list is sent.

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ErrorCategory, ScraperErrorTrait};
use crate::export;
use crate::models::{ContentMode, Field, FieldSelection, ScrapeRequest};
use crate::session::SessionEvent;
use crate::utils::error::SessionError;

use super::AppState;

// ============================================================================
// API Types
// ============================================================================

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// HTTP status for an error category
fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::Session => StatusCode::CONFLICT,
        ErrorCategory::Network
        | ErrorCategory::Browser
        | ErrorCategory::Storage
        | ErrorCategory::Other => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Body of `POST /api/count`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CountRequest {
    pub keyword: String,
    pub start_date: String,
    pub end_date: String,
}

/// Response of `POST /api/count`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub total_count: u64,
    pub keyword: String,
}

/// Query of `GET /api/scrape`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapeParams {
    pub keyword: String,
    pub start_date: String,
    pub end_date: String,
    /// Comma separated field names; empty selects every field
    pub fields: String,
    pub content_mode: String,
}

impl ScrapeParams {
    fn into_request(self) -> crate::Result<ScrapeRequest> {
        ScrapeRequest::new(
            &self.keyword,
            &self.start_date,
            &self.end_date,
            FieldSelection::parse(&self.fields),
            ContentMode::parse_or_default(&self.content_mode),
        )
    }
}

/// Body of `POST /api/export-excel`
///
/// Columns follow the same rule as scrape records: title always, then the
/// listed fields (every field when `fields` is empty), and the content column
/// only when `contentMode` is not `none`. An empty field list with mode `none`
/// therefore exports without 내용.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportRequest {
    pub results: Vec<Map<String, Value>>,
    pub fields: Vec<String>,
    pub content_mode: String,
}

impl ExportRequest {
    fn active_fields(&self) -> Vec<Field> {
        FieldSelection::from_names(&self.fields)
            .active_fields(ContentMode::parse_or_default(&self.content_mode))
    }
}

/// Response of the control endpoints
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub status: &'static str,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/status", get(session_status))
        .route("/api/count", post(count_posts))
        .route("/api/scrape", get(scrape))
        .route("/api/pause", post(pause))
        .route("/api/resume", post(resume))
        .route("/api/stop", post(stop))
        .route("/api/export-excel", post(export_excel))
        .with_state(state)
}

// ============================================================================
// Health Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn session_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.status())
}

// ============================================================================
// Scrape Handlers
// ============================================================================

async fn count_posts(
    State(state): State<AppState>,
    Json(body): Json<CountRequest>,
) -> Response {
    let request = match ScrapeRequest::new(
        &body.keyword,
        &body.start_date,
        &body.end_date,
        FieldSelection::All,
        ContentMode::Preview,
    ) {
        Ok(request) => request,
        Err(e) => return error_response(status_for(e.category()), e.localized_desc()),
    };

    match state
        .registry
        .pipeline()
        .search()
        .count(&request.keyword, &request.start_date, &request.end_date)
        .await
    {
        Ok(total_count) => Json(CountResponse {
            total_count,
            keyword: request.keyword,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(keyword = %request.keyword, error = %e, "Count failed");
            error_response(
                status_for(e.category()),
                format!("조회 중 오류가 발생했습니다: {}", e.localized_desc()),
            )
        }
    }
}

/// Server-sent event for a session event
///
/// Items carry only the active fields; the terminal events carry an empty
/// object, or the message for `error`.
pub fn to_sse_event(event: &SessionEvent, fields: &[Field]) -> Event {
    match event {
        SessionEvent::Total(total) => Event::default()
            .event("init")
            .data(json!({ "total": total }).to_string()),
        SessionEvent::Item(detail) => {
            Event::default().data(Value::Object(detail.to_record(fields)).to_string())
        }
        SessionEvent::Done => Event::default().event("done").data("{}"),
        SessionEvent::Stopped => Event::default().event("stopped").data("{}"),
        SessionEvent::Error(message) => Event::default()
            .event("error")
            .data(json!({ "error": message }).to_string()),
    }
}

async fn scrape(State(state): State<AppState>, Query(params): Query<ScrapeParams>) -> Response {
    let request = match params.into_request() {
        Ok(request) => request,
        Err(e) => return error_response(status_for(e.category()), e.localized_desc()),
    };

    let fields = request.active_fields();
    let events = state
        .registry
        .start_session(request)
        .map(move |event| Ok::<_, Infallible>(to_sse_event(&event, &fields)));

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

// ============================================================================
// Control Handlers
// ============================================================================

fn control_response(result: Result<(), SessionError>, status: &'static str) -> Response {
    match result {
        Ok(()) => Json(ControlResponse { status }).into_response(),
        Err(e) => error_response(status_for(e.category()), e.localized_desc()),
    }
}

async fn pause(State(state): State<AppState>) -> Response {
    control_response(state.registry.pause(), "paused")
}

async fn resume(State(state): State<AppState>) -> Response {
    control_response(state.registry.resume(), "resumed")
}

async fn stop(State(state): State<AppState>) -> Response {
    control_response(state.registry.stop(), "stopped")
}

// ============================================================================
// Export Handlers
// ============================================================================

async fn export_excel(Json(body): Json<ExportRequest>) -> Response {
    let fields = body.active_fields();

    match export::to_xlsx_bytes(&body.results, &fields) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, export::CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", export::FILE_NAME),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, rows = body.results.len(), "Export failed");
            error_response(status_for(e.category()), e.localized_desc())
        }
    }
}

//! HTTP request handlers for the summary API.
//!
//! Every endpoint returns a `{success, data|error}` JSON envelope. Store
//! errors surface as a 500 with the error message only; internal detail
//! never leaks past the message string.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::AppState;

/// Default number of summaries returned by the list endpoint.
const DEFAULT_LIMIT: i64 = 30;

/// Default window for the recent endpoint, in days.
const DEFAULT_RECENT_DAYS: i64 = 30;

/// Parameters for the list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

/// Parameters for the recent endpoint.
#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub days: Option<i64>,
}

/// Service banner listing the available endpoints.
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "CityScope API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/summaries": "Get all meeting summaries",
            "/summaries/<document_id>": "Get specific summary",
            "/summaries/recent": "Get recent summaries (last 30 days)"
        }
    }))
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "CityScope API"
    }))
}

/// All summaries, most recent first.
pub async fn list_summaries(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    match state.repo.get_all(Some(limit)).await {
        Ok(summaries) => Json(json!({
            "success": true,
            "count": summaries.len(),
            "data": summaries
        }))
        .into_response(),
        Err(e) => store_error(e).into_response(),
    }
}

/// A single summary by document id.
pub async fn get_summary(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> impl IntoResponse {
    match state.repo.get_by_id(&document_id).await {
        Ok(Some(summary)) => Json(json!({
            "success": true,
            "data": summary
        }))
        .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "error": "Summary not found"
            })),
        )
            .into_response(),
        Err(e) => store_error(e).into_response(),
    }
}

/// Summaries created within the last N days.
pub async fn recent_summaries(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> impl IntoResponse {
    let days = params.days.unwrap_or(DEFAULT_RECENT_DAYS);

    match state.repo.get_recent(days).await {
        Ok(summaries) => Json(json!({
            "success": true,
            "count": summaries.len(),
            "days": days,
            "data": summaries
        }))
        .into_response(),
        Err(e) => store_error(e).into_response(),
    }
}

fn store_error(e: crate::repository::DbError) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "error": e.to_string()
        })),
    )
}

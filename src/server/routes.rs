//! Router configuration for the summary API.

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/summaries", get(handlers::list_summaries))
        .route("/summaries/recent", get(handlers::recent_summaries))
        .route("/summaries/:document_id", get(handlers::get_summary))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! Read-only web API for persisted meeting summaries.
//!
//! Serves the records the pipeline has written; it never mutates the
//! store. Consumed by the resident-facing frontend, hence the permissive
//! CORS layer.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::repository::{SqlitePool, SummaryRepository};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<SummaryRepository>,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        let repo = SummaryRepository::new(
            SqlitePool::from_path(&settings.database_path()),
            &settings.portal_base_url,
        );
        Self {
            repo: Arc::new(repo),
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings);
    state.repo.init_schema().await?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! CityScope - municipal meeting document ingestion and summary service.
//!
//! Discovers published meeting documents on the City of London eScribe
//! portal, extracts their text, asks a generative model for structured
//! metadata and a resident-facing summary, and stores the result for the
//! read-only summary API.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cityscope::cli::is_verbose() {
        "cityscope=info"
    } else {
        "cityscope=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    cityscope::cli::run().await
}

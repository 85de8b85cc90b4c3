//! `frontier` - URL Frontier scheduling engine.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else).
    let _ = dotenvy::dotenv();

    let default_filter = if urlfrontier::cli::is_verbose() {
        "urlfrontier=info"
    } else {
        "urlfrontier=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    urlfrontier::cli::run().await
}

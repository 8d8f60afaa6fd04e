use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use portfolio_relay::config::{Cli, RelayConfig};
use portfolio_relay::knowledge::{FileKnowledge, KnowledgeSource, PortfolioKnowledge};
use portfolio_relay::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so clap's env fallbacks see it
    dotenv::dotenv().ok();
    init_tracing();

    let config = RelayConfig::from(Cli::parse());

    let knowledge: Arc<dyn KnowledgeSource> = match &config.knowledge_file {
        Some(path) => Arc::new(FileKnowledge::load(path)?),
        None => Arc::new(PortfolioKnowledge),
    };

    if config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; /api/chat will answer 500");
    }

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        model = %config.model,
        upstream = %config.upstream_url,
        static_dir = ?config.static_dir,
        "portfolio relay listening"
    );

    portfolio_relay::serve(listener, Arc::new(AppState::new(config, knowledge)))
        .await
        .context("Server failed")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("portfolio_relay=info,tower_http=warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

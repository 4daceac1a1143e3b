mod api;
mod appstore;
mod config;
mod cost;
mod dataset;
mod error;
mod insights;
mod llm;
mod prompt;
mod retriever;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::appstore::feed::AppStoreFeed;
use crate::config::Config;
use crate::error::Result;
use crate::llm::OpenAiClient;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let feed = Arc::new(AppStoreFeed::new(cfg.rss_url.clone())?);

    let api_key = cfg.openai_api_key.clone().unwrap_or_default();
    if api_key.is_empty() {
        warn!("OPENAI_API_KEY not set — reviews and cost estimates work, but /insights requests will fail at the completion API");
    }
    let completions = Arc::new(OpenAiClient::new(cfg.openai_api_url.clone(), api_key)?);

    info!(
        max_reviews = cfg.max_reviews,
        scrape_timeout_secs = cfg.scrape_timeout_secs,
        demo_data = %cfg.demo_data_path,
        "review insights service starting"
    );

    let state = ApiState {
        config: cfg.clone(),
        feed,
        completions,
        health: Arc::new(HealthState::new()),
    };

    let app = router(state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

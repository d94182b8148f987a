use std::sync::Arc;

mod config;
mod content;
mod db;
mod error;
mod models;
mod pipeline;
mod seeds;
mod services;

use config::Config;
use error::Result;
use pipeline::Collaborators;
use services::{EmbeddingClient, LlmClient, QdrantStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;

    let llm = config
        .claude_api_key
        .as_ref()
        .map(|key| Arc::new(LlmClient::new(key.clone())));

    let vectors = match (&config.qdrant_url, &config.gemini_api_key) {
        (Some(url), Some(key)) => Some(Arc::new(QdrantStore::new(
            url.clone(),
            config.qdrant_api_key.clone(),
            EmbeddingClient::new(key.clone()),
        ))),
        _ => None,
    };

    if llm.is_none() {
        tracing::warn!("claude_api_key not set; discovery and writing run degraded");
    }
    if vectors.is_none() {
        tracing::warn!("qdrant_url/gemini_api_key not set; extract and write are disabled");
    }

    let collab = Collaborators { llm, vectors };

    for niche in &config.niches {
        if let Err(e) = pipeline::run_niche(&config, &collab, niche).await {
            tracing::error!("Pipeline failed for niche {}: {}", niche, e);
        }
    }

    Ok(())
}

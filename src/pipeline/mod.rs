mod crawl;
mod extract;
mod write;

pub use crawl::CrawlStage;
pub use extract::ExtractStage;
pub use write::{sanitize_title, WriteStage};

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::content::refine;
use crate::db::Repository;
use crate::error::Result;
use crate::services::{
    CrawlEngine, HttpCrawler, LlmClient, LlmCrawler, QdrantStore, RagChain, RedirectResolver,
    CONTENT_FILTER_INSTRUCTION, DISCOVERY_INSTRUCTION,
};

/// Shared collaborators, constructed once per process and passed into every
/// stage driver. Missing credentials disable the stages that need them.
pub struct Collaborators {
    pub llm: Option<Arc<LlmClient>>,
    pub vectors: Option<Arc<QdrantStore>>,
}

/// Run the full crawl / extract / write sequence for one niche, with a
/// cooldown between stages to respect external rate limits.
pub async fn run_niche(config: &Config, collab: &Collaborators, niche: &str) -> Result<()> {
    let repo = Repository::new(config.db_path(niche), niche);
    let cooldown = Duration::from_secs(config.cooldown_secs);

    let discovery_engine: Arc<dyn CrawlEngine> = match &collab.llm {
        Some(llm) => Arc::new(LlmCrawler::new(llm.clone(), DISCOVERY_INSTRUCTION)),
        None => Arc::new(HttpCrawler::new()),
    };
    CrawlStage::new(discovery_engine, config.seeds_path.clone())
        .run(&repo)
        .await?;
    tokio::time::sleep(cooldown).await;

    let Some(vectors) = &collab.vectors else {
        tracing::warn!(
            "No vector store configured; skipping extract and write for niche {}",
            niche
        );
        return Ok(());
    };

    let extraction_engine: Arc<dyn CrawlEngine> = match &collab.llm {
        Some(llm) => Arc::new(LlmCrawler::new(llm.clone(), CONTENT_FILTER_INSTRUCTION)),
        None => Arc::new(HttpCrawler::new()),
    };
    ExtractStage::new(
        extraction_engine,
        Arc::new(RedirectResolver::new()),
        vectors.clone(),
        config.extract_limit,
        config.mark_policy,
    )
    .run(&repo)
    .await?;
    tokio::time::sleep(cooldown).await;

    let Some(llm) = &collab.llm else {
        tracing::warn!("No LLM configured; skipping write for niche {}", niche);
        return Ok(());
    };

    let chain = Arc::new(RagChain::new(vectors.clone(), llm.clone(), niche));
    WriteStage::new(chain, config.niche_output_dir(niche), config.write_limit)
        .run(&repo)
        .await?;
    tokio::time::sleep(cooldown).await;

    refine::refine_niche(&config.niche_output_dir(niche), llm).await;

    tracing::info!("Pipeline completed for niche {}", niche);
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use crate::db::Repository;
use crate::error::Result;
use crate::models::DiscoveredPage;
use crate::seeds::seed_urls;
use crate::services::CrawlEngine;

/// Discovery stage: crawl the niche's seed pages and record every article
/// they link to. Duplicate URLs are ignored by the store, so re-running the
/// stage is idempotent.
pub struct CrawlStage {
    engine: Arc<dyn CrawlEngine>,
    seeds_path: PathBuf,
}

impl CrawlStage {
    pub fn new(engine: Arc<dyn CrawlEngine>, seeds_path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            seeds_path: seeds_path.into(),
        }
    }

    pub async fn run(&self, repo: &Repository) -> Result<()> {
        let niche = repo.niche();
        tracing::info!("Starting crawl for niche {}", niche);

        let urls = match seed_urls(&self.seeds_path, niche) {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!("Cannot load seed URLs for niche {}: {}", niche, e);
                return Ok(());
            }
        };
        if urls.is_empty() {
            tracing::info!("No seed URLs for niche {}, nothing to crawl", niche);
            return Ok(());
        }

        let results = match self.engine.crawl_many(&urls).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Crawling failed for niche {}: {}", niche, e);
                return Ok(());
            }
        };

        let mut discovered: Vec<DiscoveredPage> = Vec::new();
        for result in results {
            if !result.success {
                tracing::debug!(
                    "Seed crawl failed for {}: {}",
                    result.url,
                    result.error_message.as_deref().unwrap_or("unknown error")
                );
                continue;
            }
            let Some(content) = result.extracted_content else {
                continue;
            };
            match serde_json::from_str::<Vec<DiscoveredPage>>(&content) {
                Ok(pages) => discovered.extend(pages.into_iter().filter(|p| !p.error)),
                Err(e) => {
                    tracing::warn!("Invalid discovery JSON from {}: {}", result.url, e);
                }
            }
        }

        repo.insert_many(discovered).await;
        Ok(())
    }
}

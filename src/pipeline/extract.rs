use std::sync::Arc;

use serde_json::Value;

use crate::content::{split_metadata, split_text};
use crate::db::Repository;
use crate::error::Result;
use crate::models::MarkPolicy;
use crate::services::{CrawlEngine, UrlResolver, VectorSink};

/// Extraction stage: crawl a bounded batch of unprocessed URLs, split out
/// their metadata, and push chunked text into the vector sink.
///
/// Redirects are resolved one URL at a time to bound concurrent sessions.
/// How completion is committed depends on the configured [`MarkPolicy`].
pub struct ExtractStage {
    engine: Arc<dyn CrawlEngine>,
    resolver: Arc<dyn UrlResolver>,
    sink: Arc<dyn VectorSink>,
    limit: usize,
    policy: MarkPolicy,
}

impl ExtractStage {
    pub fn new(
        engine: Arc<dyn CrawlEngine>,
        resolver: Arc<dyn UrlResolver>,
        sink: Arc<dyn VectorSink>,
        limit: usize,
        policy: MarkPolicy,
    ) -> Self {
        Self {
            engine,
            resolver,
            sink,
            limit,
            policy,
        }
    }

    pub async fn run(&self, repo: &Repository) -> Result<()> {
        let niche = repo.niche();
        tracing::info!("Starting extraction for niche {}", niche);

        let selected = repo.select_unprocessed(self.limit).await;
        if selected.is_empty() {
            tracing::info!("No unprocessed URLs for niche {}", niche);
            return Ok(());
        }

        let selected_ids: Vec<i64> = selected.iter().map(|r| r.id).collect();

        // Sequential on purpose: one navigation session at a time.
        let mut resolved = Vec::with_capacity(selected.len());
        for record in &selected {
            resolved.push(self.resolver.resolve(&record.url).await?);
        }

        let results = match self.engine.crawl_many(&resolved).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Extraction crawl failed for niche {}: {}", niche, e);
                Vec::new()
            }
        };

        let mut succeeded_ids = Vec::new();
        for (record, result) in selected.iter().zip(&results) {
            if !result.success {
                tracing::warn!(
                    "Extraction failed for {}: {}",
                    result.url,
                    result.error_message.as_deref().unwrap_or("unknown error")
                );
                continue;
            }
            succeeded_ids.push(record.id);

            let content = result.extracted_content.as_deref().unwrap_or_default();
            let (mut metadata, body) = split_metadata(content);
            metadata
                .entry("source_url".to_string())
                .or_insert_with(|| Value::String(result.url.clone()));

            let chunks = split_text(&body);
            if chunks.is_empty() {
                tracing::debug!("No text to embed for {}", result.url);
                continue;
            }

            let metadatas = vec![metadata; chunks.len()];
            if let Err(e) = self.sink.add_texts(niche, chunks, metadatas).await {
                tracing::warn!("Embedding/storage error for {}: {}", result.url, e);
            }
        }

        let to_mark = match self.policy {
            MarkPolicy::Attempted => selected_ids,
            MarkPolicy::Successful => succeeded_ids,
        };
        repo.mark_processed(to_mark).await;

        tracing::info!("Extraction finished for niche {}", niche);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Map;
    use std::sync::Mutex;

    use crate::error::AppError;
    use crate::models::{CrawlOutcome, DiscoveredPage};

    struct EchoResolver;

    #[async_trait]
    impl UrlResolver for EchoResolver {
        async fn resolve(&self, url: &str) -> Result<String> {
            if url.trim().is_empty() {
                return Err(AppError::InvalidUrl(url.to_string()));
            }
            Ok(url.to_string())
        }
    }

    // Succeeds for every URL except those listed in `fail`.
    struct FakeEngine {
        fail: Vec<String>,
    }

    #[async_trait]
    impl CrawlEngine for FakeEngine {
        async fn crawl_many(&self, urls: &[String]) -> Result<Vec<CrawlOutcome>> {
            Ok(urls
                .iter()
                .map(|url| {
                    if self.fail.contains(url) {
                        CrawlOutcome::failed(url.clone(), "timeout")
                    } else {
                        CrawlOutcome::ok(
                            url.clone(),
                            "```json\n{\"title\": \"T\"}\n```\n\nSome body text.",
                        )
                    }
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<(String, Vec<String>, Vec<Map<String, Value>>)>>,
    }

    #[async_trait]
    impl VectorSink for RecordingSink {
        async fn add_texts(
            &self,
            collection: &str,
            texts: Vec<String>,
            metadatas: Vec<Map<String, Value>>,
        ) -> Result<()> {
            self.batches
                .lock()
                .unwrap()
                .push((collection.to_string(), texts, metadatas));
            Ok(())
        }
    }

    async fn seeded_repo(dir: &tempfile::TempDir, count: usize) -> Repository {
        let repo = Repository::new(dir.path().join("db.sqlite"), "ai_ml");
        let pages = (0..count)
            .map(|i| DiscoveredPage {
                url: format!("https://a.com/{}", i),
                title: Some(format!("Title {}", i)),
                error: false,
            })
            .collect();
        repo.try_insert_many(pages).await.unwrap();
        repo
    }

    #[tokio::test]
    async fn limit_bounds_the_batch_and_all_attempted_are_marked() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo(&dir, 5).await;

        // One of the two selected URLs fails to crawl.
        let engine = Arc::new(FakeEngine {
            fail: vec!["https://a.com/0".to_string()],
        });
        let sink = Arc::new(RecordingSink::default());

        let stage = ExtractStage::new(
            engine,
            Arc::new(EchoResolver),
            sink.clone(),
            2,
            MarkPolicy::Attempted,
        );
        stage.run(&repo).await.unwrap();

        // Exactly the two selected rows are marked, success or not.
        assert_eq!(repo.select_unprocessed(10).await.len(), 3);
        // Only the successful result reached the sink.
        assert_eq!(sink.batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn successful_policy_marks_only_succeeding_rows() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo(&dir, 2).await;

        let engine = Arc::new(FakeEngine {
            fail: vec!["https://a.com/0".to_string()],
        });

        let stage = ExtractStage::new(
            engine,
            Arc::new(EchoResolver),
            Arc::new(RecordingSink::default()),
            10,
            MarkPolicy::Successful,
        );
        stage.run(&repo).await.unwrap();

        // The failing row stays selectable.
        let remaining = repo.select_unprocessed(10).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].url, "https://a.com/0");
    }

    #[tokio::test]
    async fn chunks_carry_metadata_and_source_url() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo(&dir, 1).await;

        let engine = Arc::new(FakeEngine { fail: Vec::new() });
        let sink = Arc::new(RecordingSink::default());

        let stage = ExtractStage::new(
            engine,
            Arc::new(EchoResolver),
            sink.clone(),
            10,
            MarkPolicy::Attempted,
        );
        stage.run(&repo).await.unwrap();

        let batches = sink.batches.lock().unwrap();
        let (collection, texts, metadatas) = &batches[0];
        assert_eq!(collection, "ai_ml");
        assert_eq!(texts.len(), metadatas.len());
        assert_eq!(metadatas[0]["title"], "T");
        assert_eq!(metadatas[0]["source_url"], "https://a.com/0");
        // The metadata fence never reaches the embedding sink.
        assert!(!texts[0].contains("```"));
    }

    #[tokio::test]
    async fn engine_failure_still_commits_attempted_rows() {
        struct FailingEngine;

        #[async_trait]
        impl CrawlEngine for FailingEngine {
            async fn crawl_many(&self, _urls: &[String]) -> Result<Vec<CrawlOutcome>> {
                Err(anyhow::anyhow!("engine exploded").into())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo(&dir, 3).await;

        let stage = ExtractStage::new(
            Arc::new(FailingEngine),
            Arc::new(EchoResolver),
            Arc::new(RecordingSink::default()),
            2,
            MarkPolicy::Attempted,
        );
        stage.run(&repo).await.unwrap();

        assert_eq!(repo.select_unprocessed(10).await.len(), 1);
    }
}

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::content::generate_post;
use crate::db::Repository;
use crate::error::Result;
use crate::models::Post;
use crate::services::RetrievalChain;

/// Write stage: turn each pending title into a validated article on disk.
///
/// A topic that fails generation stays pending and is retried on a future
/// run; a saved article is committed back to the store by title.
pub struct WriteStage {
    chain: Arc<dyn RetrievalChain>,
    output_dir: PathBuf,
    limit: Option<usize>,
}

impl WriteStage {
    pub fn new(
        chain: Arc<dyn RetrievalChain>,
        output_dir: impl Into<PathBuf>,
        limit: Option<usize>,
    ) -> Self {
        Self {
            chain,
            output_dir: output_dir.into(),
            limit,
        }
    }

    pub async fn run(&self, repo: &Repository) -> Result<()> {
        let niche = repo.niche();
        tracing::info!("Starting content writing for niche {}", niche);

        let mut titles = repo.select_titles_pending_write().await;
        // Rows sharing a title are all cleared by one mark_written, so the
        // duplicate entries would only regenerate the same article.
        let mut seen = HashSet::new();
        titles.retain(|title| seen.insert(title.clone()));
        if let Some(limit) = self.limit {
            titles.truncate(limit);
        }
        if titles.is_empty() {
            tracing::info!("No titles pending write for niche {}", niche);
            return Ok(());
        }

        for title in titles {
            let Some(post) = generate_post(&title, self.chain.as_ref()).await else {
                continue;
            };

            match self.save_post(&title, &post) {
                Ok(path) => {
                    repo.mark_written(&title).await;
                    tracing::info!("Content saved for '{}' -> {}", title, path.display());
                }
                Err(e) => {
                    tracing::warn!("Error saving content for '{}': {}", title, e);
                }
            }
        }

        Ok(())
    }

    fn save_post(&self, title: &str, post: &Post) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}.json", sanitize_title(title)));
        std::fs::write(&path, serde_json::to_string_pretty(post)?)?;
        Ok(path)
    }
}

/// Derive a filesystem-safe filename stem from a title.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

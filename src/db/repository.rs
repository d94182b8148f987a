use std::path::{Path, PathBuf};

use rusqlite::{params, params_from_iter};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{DiscoveredPage, UrlRef};

use super::schema::SCHEMA;

/// Durable per-niche record store over a sqlite file.
///
/// Connections are opened per call and dropped when the call returns, so a
/// long-running stage never holds a lock across collaborator round-trips.
/// Public operations never propagate store failures: reads degrade to empty
/// results and writes abandon the batch, both logged with niche context.
/// The `try_*` variants expose the underlying errors.
pub struct Repository {
    db_path: PathBuf,
    niche: String,
}

impl Repository {
    pub fn new(db_path: impl AsRef<Path>, niche: impl Into<String>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            niche: niche.into(),
        }
    }

    pub fn niche(&self) -> &str {
        &self.niche
    }

    async fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.db_path).await?;
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        Ok(conn)
    }

    // Insert-or-ignore discovery

    pub async fn insert_many(&self, pages: Vec<DiscoveredPage>) {
        match self.try_insert_many(pages).await {
            Ok(n) => tracing::info!("Saved {} new URLs for niche {}", n, self.niche),
            Err(e) => tracing::warn!("Failed to save URLs for niche {}: {}", self.niche, e),
        }
    }

    pub async fn try_insert_many(&self, pages: Vec<DiscoveredPage>) -> Result<usize> {
        let conn = self.connect().await?;
        let niche = self.niche.clone();
        let inserted = conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0;
                for page in pages.iter().filter(|p| !p.url.is_empty()) {
                    inserted += tx.execute(
                        "INSERT OR IGNORE INTO urls (url, title, niche) VALUES (?1, ?2, ?3)",
                        params![page.url, page.title, niche],
                    )?;
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;
        Ok(inserted)
    }

    // Extraction selection and commit

    pub async fn select_unprocessed(&self, limit: usize) -> Vec<UrlRef> {
        match self.try_select_unprocessed(limit).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    "Failed to select unprocessed URLs for niche {}: {}",
                    self.niche,
                    e
                );
                Vec::new()
            }
        }
    }

    pub async fn try_select_unprocessed(&self, limit: usize) -> Result<Vec<UrlRef>> {
        let conn = self.connect().await?;
        let rows = conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT id, url FROM urls WHERE processed = 0 LIMIT ?1")?;
                let rows = stmt
                    .query_map(params![limit], |row| {
                        Ok(UrlRef {
                            id: row.get(0)?,
                            url: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    pub async fn mark_processed(&self, ids: Vec<i64>) {
        if ids.is_empty() {
            tracing::info!("No URLs to mark as processed for niche {}", self.niche);
            return;
        }
        let count = ids.len();
        match self.try_mark_processed(ids).await {
            Ok(()) => tracing::info!(
                "Marked {} URLs as processed in niche {}",
                count,
                self.niche
            ),
            Err(e) => tracing::warn!(
                "Failed to mark URLs as processed in niche {}: {}",
                self.niche,
                e
            ),
        }
    }

    pub async fn try_mark_processed(&self, ids: Vec<i64>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let conn = self.connect().await?;
        conn.call(move |conn| {
            let placeholders = vec!["?"; ids.len()].join(",");
            let sql = format!("UPDATE urls SET processed = 1 WHERE id IN ({})", placeholders);
            conn.execute(&sql, params_from_iter(ids.iter()))?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    // Write-stage selection and commit

    pub async fn select_titles_pending_write(&self) -> Vec<String> {
        match self.try_select_titles_pending_write().await {
            Ok(titles) => titles,
            Err(e) => {
                tracing::warn!(
                    "Failed to select pending titles for niche {}: {}",
                    self.niche,
                    e
                );
                Vec::new()
            }
        }
    }

    pub async fn try_select_titles_pending_write(&self) -> Result<Vec<String>> {
        let conn = self.connect().await?;
        let titles = conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT title FROM urls
                     WHERE processed = 1 AND content_written = 0 AND title IS NOT NULL",
                )?;
                let titles = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(titles)
            })
            .await?;
        Ok(titles)
    }

    pub async fn mark_written(&self, title: &str) {
        match self.try_mark_written(title).await {
            Ok(()) => tracing::info!(
                "Marked '{}' as written in niche {}",
                title,
                self.niche
            ),
            Err(e) => tracing::warn!(
                "Failed to mark '{}' as written in niche {}: {}",
                title,
                self.niche,
                e
            ),
        }
    }

    /// Matches by title, not id. Two rows sharing a title are both marked.
    pub async fn try_mark_written(&self, title: &str) -> Result<()> {
        let conn = self.connect().await?;
        let title = title.to_string();
        conn.call(move |conn| {
            conn.execute(
                "UPDATE urls SET content_written = 1 WHERE title = ?1",
                params![title],
            )?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn try_count_rows(&self) -> Result<i64> {
        let conn = self.connect().await?;
        let count = conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM urls", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, title: Option<&str>) -> DiscoveredPage {
        DiscoveredPage {
            url: url.to_string(),
            title: title.map(|t| t.to_string()),
            error: false,
        }
    }

    fn repo(dir: &tempfile::TempDir) -> Repository {
        Repository::new(dir.path().join("test_web_sources.db"), "ai_ml")
    }

    #[tokio::test]
    async fn repeated_discovery_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);

        repo.try_insert_many(vec![page("https://a.com/x", Some("X"))])
            .await
            .unwrap();
        repo.try_insert_many(vec![page("https://a.com/x", Some("X again"))])
            .await
            .unwrap();

        assert_eq!(repo.try_count_rows().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_urls_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);

        let inserted = repo
            .try_insert_many(vec![page("", Some("no url")), page("https://a.com", None)])
            .await
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(repo.try_count_rows().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn processed_rows_are_never_selected_again() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);

        repo.try_insert_many(vec![
            page("https://a.com/1", Some("One")),
            page("https://a.com/2", Some("Two")),
        ])
        .await
        .unwrap();

        let selected = repo.select_unprocessed(10).await;
        assert_eq!(selected.len(), 2);

        repo.try_mark_processed(vec![selected[0].id]).await.unwrap();

        let remaining = repo.select_unprocessed(10).await;
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].id, selected[0].id);
    }

    #[tokio::test]
    async fn select_unprocessed_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);

        let pages = (0..5)
            .map(|i| page(&format!("https://a.com/{}", i), Some("T")))
            .collect();
        repo.try_insert_many(pages).await.unwrap();

        assert_eq!(repo.select_unprocessed(2).await.len(), 2);
    }

    #[tokio::test]
    async fn mark_processed_with_no_ids_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);

        repo.try_insert_many(vec![page("https://a.com/1", Some("One"))])
            .await
            .unwrap();
        repo.mark_processed(Vec::new()).await;

        assert_eq!(repo.select_unprocessed(10).await.len(), 1);
    }

    #[tokio::test]
    async fn written_titles_leave_the_pending_set() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);

        repo.try_insert_many(vec![
            page("https://a.com/1", Some("One")),
            page("https://a.com/2", Some("Two")),
            page("https://a.com/3", None),
        ])
        .await
        .unwrap();

        let ids: Vec<i64> = repo.select_unprocessed(10).await.iter().map(|r| r.id).collect();
        repo.try_mark_processed(ids).await.unwrap();

        // Null titles are excluded from the pending set.
        let pending = repo.select_titles_pending_write().await;
        assert_eq!(pending.len(), 2);

        repo.try_mark_written("One").await.unwrap();

        let pending = repo.select_titles_pending_write().await;
        assert_eq!(pending, vec!["Two".to_string()]);
    }

    #[tokio::test]
    async fn mark_written_shared_title_marks_both() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);

        repo.try_insert_many(vec![
            page("https://a.com/1", Some("Same")),
            page("https://b.com/1", Some("Same")),
        ])
        .await
        .unwrap();

        let ids: Vec<i64> = repo.select_unprocessed(10).await.iter().map(|r| r.id).collect();
        repo.try_mark_processed(ids).await.unwrap();
        repo.try_mark_written("Same").await.unwrap();

        assert!(repo.select_titles_pending_write().await.is_empty());
    }

    #[tokio::test]
    async fn unreadable_store_degrades_to_empty_reads() {
        // A directory where the db file should be makes every open fail.
        let dir = tempfile::tempdir().unwrap();
        let bad_path = dir.path().join("not_a_db");
        std::fs::create_dir_all(&bad_path).unwrap();
        let repo = Repository::new(&bad_path, "ai_ml");

        assert!(repo.select_unprocessed(10).await.is_empty());
        assert!(repo.select_titles_pending_write().await.is_empty());
        assert!(repo.try_insert_many(vec![page("https://a.com", None)]).await.is_err());
    }
}

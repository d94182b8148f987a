use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

use crate::error::{AppError, Result};
use crate::services::embeddings::{EmbeddingClient, EMBEDDING_DIM};

/// Destination for extracted text chunks. One metadata object per chunk.
#[async_trait]
pub trait VectorSink: Send + Sync {
    async fn add_texts(
        &self,
        collection: &str,
        texts: Vec<String>,
        metadatas: Vec<Map<String, Value>>,
    ) -> Result<()>;
}

/// Qdrant-backed vector store speaking the REST API.
pub struct QdrantStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    embedder: EmbeddingClient,
}

impl QdrantStore {
    pub fn new(base_url: String, api_key: Option<String>, embedder: EmbeddingClient) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            embedder,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    /// Create the collection if it does not exist yet.
    pub async fn ensure_collection(&self, name: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, &format!("/collections/{}", name))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let body = json!({
            "vectors": { "size": EMBEDDING_DIM, "distance": "Cosine" }
        });

        let response = self
            .request(reqwest::Method::PUT, &format!("/collections/{}", name))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::QdrantApi(format!(
                "Failed to create collection {}: {}",
                name, error_text
            )));
        }

        tracing::info!("Created Qdrant collection {}", name);
        Ok(())
    }

    /// Retrieve the text payloads of the `limit` closest chunks to `query`.
    pub async fn search(&self, collection: &str, query: &str, limit: usize) -> Result<Vec<String>> {
        let vectors = self.embedder.embed(&[query.to_string()]).await?;
        let vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| AppError::QdrantApi("Empty embedding for query".to_string()))?;

        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{}/points/search", collection),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::QdrantApi(format!(
                "Search failed in {}: {}",
                collection, error_text
            )));
        }

        let result: Value = response.json().await?;
        let texts = result["result"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| hit["payload"]["text"].as_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(texts)
    }
}

#[async_trait]
impl VectorSink for QdrantStore {
    async fn add_texts(
        &self,
        collection: &str,
        texts: Vec<String>,
        metadatas: Vec<Map<String, Value>>,
    ) -> Result<()> {
        if texts.is_empty() {
            return Ok(());
        }

        self.ensure_collection(collection).await?;

        let vectors = self.embedder.embed(&texts).await?;

        let points: Vec<Value> = texts
            .iter()
            .zip(vectors)
            .zip(metadatas)
            .map(|((text, vector), metadata)| {
                let mut payload = metadata;
                payload.insert("text".to_string(), Value::String(text.clone()));
                json!({
                    "id": point_id(text),
                    "vector": vector,
                    "payload": payload,
                })
            })
            .collect();

        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/collections/{}/points", collection),
            )
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::QdrantApi(format!(
                "Upsert failed in {}: {}",
                collection, error_text
            )));
        }

        Ok(())
    }
}

// Deterministic point id: identical chunks overwrite instead of piling up.
fn point_id(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const EMBEDDING_MODEL: &str = "models/embedding-001";

/// Dimension of the embedding model's output vectors.
pub const EMBEDDING_DIM: usize = 768;

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
}

#[derive(Debug, Serialize)]
struct EmbedContent {
    parts: Vec<EmbedPart>,
}

#[derive(Debug, Serialize)]
struct EmbedPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Embedding>,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

/// Client for the embedding model endpoint.
pub struct EmbeddingClient {
    client: Client,
    api_key: String,
}

impl EmbeddingClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, api_key }
    }

    /// Embed a batch of texts, one vector per input in order.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: EMBEDDING_MODEL.to_string(),
                    content: EmbedContent {
                        parts: vec![EmbedPart { text: text.clone() }],
                    },
                })
                .collect(),
        };

        let url = format!(
            "{}/{}:batchEmbedContents?key={}",
            GEMINI_API_URL, EMBEDDING_MODEL, self.api_key
        );

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::EmbeddingApi(format!("API error: {}", error_text)));
        }

        let batch: BatchEmbedResponse = response.json().await?;

        if batch.embeddings.len() != texts.len() {
            return Err(AppError::EmbeddingApi(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                batch.embeddings.len()
            )));
        }

        Ok(batch.embeddings.into_iter().map(|e| e.values).collect())
    }
}

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::services::llm::LlmClient;
use crate::services::qdrant::QdrantStore;

/// Retrieval-augmented generation seam: a free-text query in, the raw model
/// output back. The write stage only ever sees this interface.
#[async_trait]
pub trait RetrievalChain: Send + Sync {
    async fn invoke(&self, query: &str) -> Result<String>;
}

/// Chain that retrieves the closest stored chunks for the query and hands
/// them to the LLM as context for a single completion.
pub struct RagChain {
    store: Arc<QdrantStore>,
    llm: Arc<LlmClient>,
    collection: String,
    top_k: usize,
}

impl RagChain {
    pub fn new(store: Arc<QdrantStore>, llm: Arc<LlmClient>, collection: impl Into<String>) -> Self {
        Self {
            store,
            llm,
            collection: collection.into(),
            top_k: 6,
        }
    }
}

#[async_trait]
impl RetrievalChain for RagChain {
    async fn invoke(&self, query: &str) -> Result<String> {
        let chunks = self.store.search(&self.collection, query, self.top_k).await?;
        tracing::debug!(
            "Retrieved {} context chunks from {}",
            chunks.len(),
            self.collection
        );

        let context = chunks.join("\n\n---\n\n");
        let prompt = format!(
            "Use ONLY the following retrieved context to complete the task.\n\n\
             Context:\n{}\n\nTask:\n{}",
            context, query
        );

        self.llm.generate(None, &prompt).await
    }
}

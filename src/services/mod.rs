mod chain;
mod crawler;
mod embeddings;
mod llm;
mod qdrant;
mod redirect;

pub use chain::{RagChain, RetrievalChain};
pub use crawler::{
    CrawlEngine, HttpCrawler, LlmCrawler, CONTENT_FILTER_INSTRUCTION, DISCOVERY_INSTRUCTION,
};
pub use embeddings::EmbeddingClient;
pub use llm::LlmClient;
pub use qdrant::{QdrantStore, VectorSink};
pub use redirect::{RedirectResolver, UrlResolver};

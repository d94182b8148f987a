use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;

use crate::error::Result;
use crate::models::CrawlOutcome;
use crate::services::llm::LlmClient;

const USER_AGENT_STRING: &str = "Mozilla/5.0 Curiostack/0.1";

/// Instruction for discovery crawls: turn a seed page into a machine-readable
/// list of linked articles.
pub const DISCOVERY_INSTRUCTION: &str = "\
You are an expert content extractor. From the provided page text, extract the \
individual blog posts or articles linked on the page.
- Return a single JSON array of objects with fields: url, title.
- Map fields precisely; if a title is missing use null.
- Ignore navigation, ads, cookie banners, comments, and UI elements.
- Return ONLY the JSON array. No code fences, no extra text.";

/// Instruction for extraction crawls: high-value content plus a metadata
/// block the normalizer can split off.
pub const CONTENT_FILTER_INSTRUCTION: &str = "\
Task: From the provided page text, extract the high-value educational \
material. Preserve structure and completeness. Exclude ads, navigation, \
comments, cookie notices, and unrelated sections.

Output format: produce TWO sections exactly in this order.

SECTION 1 - Metadata, a single JSON object in a fenced json code block:
```json
{
  \"title\": \"string\",
  \"author\": \"string|null\",
  \"published_date\": \"YYYY-MM-DD|null\",
  \"source_url\": \"string\",
  \"tags\": [\"string\"]
}
```

SECTION 2 - Full content as Markdown.

Rules:
- If a metadata value is unknown, use null (not \"Unknown\").
- Keep the original logical order, headings, lists, and code blocks.
- Remove boilerplate. Do not include prose outside the two sections.";

/// External crawling engine seam: a batch of URLs in, one outcome per URL
/// back, in order.
#[async_trait]
pub trait CrawlEngine: Send + Sync {
    async fn crawl_many(&self, urls: &[String]) -> Result<Vec<CrawlOutcome>>;
}

/// Plain HTTP crawler: fetches each page and reduces it to readable text.
pub struct HttpCrawler {
    client: Client,
    concurrency: usize,
}

impl HttpCrawler {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT_STRING)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            concurrency: 5,
        }
    }

    async fn fetch_page(&self, url: &str) -> std::result::Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let html = response.text().await.map_err(|e| e.to_string())?;

        let text = html2text::from_read(html.as_bytes(), 80).map_err(|e| e.to_string())?;

        // Collapse the converter's whitespace noise.
        let cleaned: String = text
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if cleaned.is_empty() {
            return Err("Empty page content".to_string());
        }

        Ok(cleaned)
    }
}

impl Default for HttpCrawler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CrawlEngine for HttpCrawler {
    async fn crawl_many(&self, urls: &[String]) -> Result<Vec<CrawlOutcome>> {
        let outcomes = stream::iter(urls.to_vec())
            .map(|url| async move {
                match self.fetch_page(&url).await {
                    Ok(text) => CrawlOutcome::ok(url, text),
                    Err(message) => {
                        tracing::debug!("Failed to fetch {}: {}", url, message);
                        CrawlOutcome::failed(url, message)
                    }
                }
            })
            .buffered(self.concurrency) // keep result order aligned with input
            .collect::<Vec<_>>()
            .await;

        Ok(outcomes)
    }
}

/// Crawler that runs an instruction-driven LLM pass over each fetched page,
/// so `extracted_content` carries the structured output a stage expects.
pub struct LlmCrawler {
    inner: HttpCrawler,
    llm: Arc<LlmClient>,
    instruction: String,
}

impl LlmCrawler {
    pub fn new(llm: Arc<LlmClient>, instruction: impl Into<String>) -> Self {
        Self {
            inner: HttpCrawler::new(),
            llm,
            instruction: instruction.into(),
        }
    }
}

#[async_trait]
impl CrawlEngine for LlmCrawler {
    async fn crawl_many(&self, urls: &[String]) -> Result<Vec<CrawlOutcome>> {
        let fetched = self.inner.crawl_many(urls).await?;

        // LLM passes run sequentially to stay inside provider rate limits.
        let mut outcomes = Vec::with_capacity(fetched.len());
        for outcome in fetched {
            if !outcome.success {
                outcomes.push(outcome);
                continue;
            }
            let page_text = outcome.extracted_content.as_deref().unwrap_or_default();
            match self.llm.generate(Some(&self.instruction), page_text).await {
                Ok(extracted) => outcomes.push(CrawlOutcome::ok(outcome.url, extracted)),
                Err(e) => {
                    tracing::debug!("LLM extraction failed for {}: {}", outcome.url, e);
                    outcomes.push(CrawlOutcome::failed(outcome.url, e.to_string()));
                }
            }
        }

        Ok(outcomes)
    }
}

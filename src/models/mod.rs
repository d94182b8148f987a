use serde::{Deserialize, Serialize};

/// A unit of extraction work: the row id plus the url to crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRef {
    pub id: i64,
    pub url: String,
}

/// One item discovered on a seed page by the crawl stage.
///
/// The discovery extractor sometimes emits placeholder entries flagged with
/// `error: true`; those are filtered out before insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredPage {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub error: bool,
}

/// Per-URL result returned by a crawl engine invocation.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub url: String,
    pub success: bool,
    pub extracted_content: Option<String>,
    pub error_message: Option<String>,
}

impl CrawlOutcome {
    pub fn ok(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: true,
            extracted_content: Some(content.into()),
            error_message: None,
        }
    }

    pub fn failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            extracted_content: None,
            error_message: Some(message.into()),
        }
    }
}

/// A generated article, validated against this schema before it is saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub featured: bool,
}

/// How the extract stage commits progress after a crawl batch.
///
/// `Attempted` marks every selected row regardless of per-URL outcome, so a
/// flaky page cannot be re-selected forever. `Successful` marks only rows
/// whose crawl succeeded, trading reprocessing for completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkPolicy {
    #[default]
    Attempted,
    Successful,
}

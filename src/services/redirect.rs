use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Seam for redirect resolution so stage drivers can swap in fakes.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<String>;
}

/// Resolves a seed URL to its final destination before it is crawled.
///
/// Resolution is best-effort: a navigation failure falls back to the
/// normalized input URL. An empty input is a caller bug and errors out.
pub struct RedirectResolver {
    client: Client,
}

impl RedirectResolver {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(NAVIGATION_TIMEOUT)
            .user_agent("Mozilla/5.0 Curiostack/0.1")
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    pub async fn resolve(&self, url: &str) -> Result<String> {
        let normalized = normalize_url(url)?;

        match self.client.get(&normalized).send().await {
            Ok(response) => {
                let final_url = response.url().to_string();
                if final_url != normalized {
                    tracing::debug!("Redirect: {} -> {}", normalized, final_url);
                }
                Ok(final_url)
            }
            Err(e) => {
                tracing::debug!("Navigation error for {}: {}", normalized, e);
                Ok(normalized)
            }
        }
    }
}

impl Default for RedirectResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlResolver for RedirectResolver {
    async fn resolve(&self, url: &str) -> Result<String> {
        RedirectResolver::resolve(self, url).await
    }
}

/// Prefix a scheme when missing and check the result actually parses.
/// Empty or unparseable input is a contract violation.
pub fn normalize_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidUrl(url.to_string()));
    }
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    Url::parse(&candidate).map_err(|_| AppError::InvalidUrl(url.to_string()))?;
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_a_scheme() {
        assert_eq!(
            normalize_url("example.com/post").unwrap(),
            "https://example.com/post"
        );
    }

    #[test]
    fn existing_scheme_is_kept() {
        assert_eq!(
            normalize_url("http://example.com").unwrap(),
            "http://example.com"
        );
        assert_eq!(
            normalize_url("https://example.com").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn empty_url_is_a_contract_error() {
        assert!(matches!(normalize_url(""), Err(AppError::InvalidUrl(_))));
        assert!(matches!(normalize_url("   "), Err(AppError::InvalidUrl(_))));
    }

    #[test]
    fn unparseable_url_is_rejected() {
        assert!(matches!(normalize_url("http://"), Err(AppError::InvalidUrl(_))));
        assert!(matches!(
            normalize_url("exa mple.com"),
            Err(AppError::InvalidUrl(_))
        ));
    }
}

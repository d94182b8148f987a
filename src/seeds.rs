use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Load the seed URL list for a niche from the seeds file.
///
/// The file is a single JSON object mapping niche names to URL lists. A niche
/// missing from the file yields an empty list, not an error.
pub fn seed_urls(path: impl AsRef<Path>, niche: &str) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let mut seeds: HashMap<String, Vec<String>> = serde_json::from_str(&content)?;

    match seeds.remove(niche) {
        Some(urls) => Ok(urls),
        None => {
            tracing::warn!("No seed URLs configured for niche {}", niche);
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_urls_for_known_niche() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"ai_ml": ["https://a.com", "https://b.com"], "cybersecurity": []}}"#
        )
        .unwrap();

        let urls = seed_urls(file.path(), "ai_ml").unwrap();
        assert_eq!(urls, vec!["https://a.com", "https://b.com"]);
    }

    #[test]
    fn unknown_niche_yields_empty_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ai_ml": ["https://a.com"]}}"#).unwrap();

        assert!(seed_urls(file.path(), "gardening").unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(seed_urls("/nonexistent/urls.json", "ai_ml").is_err());
    }
}

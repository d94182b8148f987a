use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json(.*?)```").expect("valid regex"))
}

/// Split a crawl result into its embedded metadata block and the remaining
/// body text.
///
/// Extraction crawls emit a single fenced ```json block ahead of the content.
/// When the block parses as a JSON object it is returned as the metadata and
/// stripped from the body. A missing or malformed block yields empty metadata
/// and the input unchanged. Total over arbitrary input.
pub fn split_metadata(text: &str) -> (Map<String, Value>, String) {
    let Some(captures) = fence_re().captures(text) else {
        return (Map::new(), text.to_string());
    };

    let fence = captures.get(0).expect("whole match").as_str();
    let inner = captures.get(1).map(|m| m.as_str()).unwrap_or_default();

    match serde_json::from_str::<Value>(inner) {
        Ok(Value::Object(metadata)) => {
            let body = text.replacen(fence, "", 1).trim().to_string();
            (metadata, body)
        }
        Ok(other) => {
            tracing::warn!(
                "Metadata block is not a JSON object (got {})",
                json_kind(&other)
            );
            (Map::new(), text.to_string())
        }
        Err(e) => {
            tracing::warn!("Metadata parsing failed: {}", e);
            (Map::new(), text.to_string())
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fence_returns_input_unchanged() {
        let text = "# Heading\n\nSome plain markdown.";
        let (metadata, body) = split_metadata(text);
        assert!(metadata.is_empty());
        assert_eq!(body, text);
    }

    #[test]
    fn valid_fence_is_parsed_and_stripped() {
        let text = "```json\n{\"title\": \"T\", \"tags\": [\"a\"]}\n```\n\nBody text here.";
        let (metadata, body) = split_metadata(text);
        assert_eq!(metadata["title"], "T");
        assert_eq!(body, "Body text here.");
        assert!(!body.contains("```"));
    }

    #[test]
    fn malformed_fence_is_left_in_place() {
        let text = "```json\n{not valid json\n```\n\nBody text here.";
        let (metadata, body) = split_metadata(text);
        assert!(metadata.is_empty());
        assert_eq!(body, text);
    }

    #[test]
    fn non_object_json_is_treated_as_malformed() {
        let text = "```json\n[1, 2, 3]\n```\nBody.";
        let (metadata, body) = split_metadata(text);
        assert!(metadata.is_empty());
        assert_eq!(body, text);
    }

    #[test]
    fn only_first_fence_is_consumed() {
        let text = "```json\n{\"a\": 1}\n```\nmiddle\n```json\n{\"b\": 2}\n```";
        let (metadata, body) = split_metadata(text);
        assert_eq!(metadata["a"], 1);
        assert!(body.contains("\"b\""));
    }
}

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

use crate::models::Post;
use crate::services::RetrievalChain;

const RETRY_PREAMBLE: &str =
    "Return ONLY a valid JSON object per the schema. No prose, no code fences, no comments. ";

/// Fields where the model habitually writes "Unknown" instead of null.
const NULLABLE_FIELDS: [&str; 4] = ["url", "author", "date", "image"];

fn build_query(topic: &str) -> String {
    format!(
        r###"You are a precise content writer. Using only retrieved context, produce a STRICT JSON object with fields below. Do not include code fences or any extra text.

Schema:
{{
"title": "string",
"content": "markdown string (no top-level # title; use ## for sections)",
"excerpt": "1-2 sentence summary",
"url": "string|null",
"author": "string|null",
"date": "YYYY-MM-DD|null",
"category": "string",
"tags": ["string"],
"image": "string|null",
"featured": false
}}

Writing rules:
- Do NOT repeat the title inside content.
- Structure content with meaningful sections (##), lists, tables, and code blocks when relevant.
- End content with a section: "## Key Takeaways" listing 4-8 bullets.
- Keep all prose strictly inside the content field.

Topic: {}"###,
        topic
    )
}

/// Generate a validated article for a topic through the retrieval chain.
///
/// One invocation, then exactly one retry with a harder preamble when the
/// response does not parse as JSON (a transport failure spends the same
/// budget). `None` leaves the topic pending for a future run.
pub async fn generate_post(topic: &str, chain: &dyn RetrievalChain) -> Option<Post> {
    let query = build_query(topic);

    let payload = match attempt(chain, &query).await {
        Ok(value) => value,
        Err(first_output) => {
            let retry_query = format!("{}{}", RETRY_PREAMBLE, query);
            match attempt(chain, &retry_query).await {
                Ok(value) => value,
                Err(retry_output) => {
                    tracing::warn!("Skipping topic '{}' due to invalid JSON after retry", topic);
                    tracing::debug!(
                        "First output: {}\nRetry output: {}",
                        first_output,
                        retry_output
                    );
                    return None;
                }
            }
        }
    };

    let normalized = normalize_payload(payload);
    match serde_json::from_value::<Post>(normalized) {
        Ok(post) => Some(post),
        Err(e) => {
            tracing::warn!("Validation failed for topic '{}': {}", topic, e);
            None
        }
    }
}

// One chain round-trip; the raw (or error) text comes back on failure so the
// caller can log both attempts.
async fn attempt(chain: &dyn RetrievalChain, query: &str) -> Result<Value, String> {
    let raw = match chain.invoke(query).await {
        Ok(raw) => raw,
        Err(e) => return Err(format!("<chain error: {}>", e)),
    };
    let clean = strip_code_fences(&raw);
    serde_json::from_str(&clean).map_err(|_| raw)
}

pub fn strip_code_fences(raw: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"```(?:json)?").expect("valid regex"));
    re.replace_all(raw, "").trim().to_string()
}

/// Coerce the model's loose payload into schema shape before validation.
pub fn normalize_payload(mut payload: Value) -> Value {
    let Some(obj) = payload.as_object_mut() else {
        return payload;
    };

    for field in NULLABLE_FIELDS {
        let is_sentinel = matches!(
            obj.get(field),
            Some(Value::String(s)) if matches!(
                s.trim().to_lowercase().as_str(),
                "unknown" | "n/a" | "" | "null"
            )
        );
        if is_sentinel {
            obj.insert(field.to_string(), Value::Null);
        }
    }

    if let Some(s) = obj.get("featured").and_then(Value::as_str).map(str::to_owned) {
        let truthy = matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes");
        obj.insert("featured".to_string(), Value::Bool(truthy));
    }

    if let Some(s) = obj.get("date").and_then(Value::as_str).map(str::to_owned) {
        let normalized = normalize_date(&s).map(Value::String).unwrap_or(Value::Null);
        obj.insert("date".to_string(), normalized);
    }

    if let Some(raw_content) = obj.get("content").and_then(Value::as_str).map(str::to_owned) {
        let mut content = strip_leading_heading(&raw_content);
        if !content.contains("## Key Takeaways") {
            content = format!("{}\n\n## Key Takeaways\n- ", content.trim_end());
        }
        obj.insert("content".to_string(), Value::String(content));
    }

    payload
}

/// Reformat any parseable date string to YYYY-MM-DD; anything else is None.
pub fn normalize_date(raw: &str) -> Option<String> {
    let cleaned = raw.trim().replace('/', "-");

    if let Ok(date) = NaiveDate::parse_from_str(&cleaned, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date().format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date().format("%Y-%m-%d").to_string());
    }
    None
}

// Remove one top-level heading from the start of the body.
fn strip_leading_heading(content: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^#\s+.*\n+").expect("valid regex"));
    re.replacen(content, 1, "").to_string()
}

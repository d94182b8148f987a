use std::path::Path;

use chrono::Local;
use serde_json::Value;

use crate::services::LlmClient;

/// Canonical categories the published site understands.
pub const MAIN_CATEGORIES: [&str; 5] = [
    "AI",
    "Technology",
    "Business",
    "Cybersecurity",
    "Data Science",
];

/// Post-write cleanup over a niche's output directory: snap categories to the
/// canonical set and fill in missing dates. Per-file errors are logged and
/// the pass moves on.
pub async fn refine_niche(output_dir: &Path, llm: &LlmClient) {
    let entries = match std::fs::read_dir(output_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot read output dir {}: {}", output_dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        if let Err(e) = refine_file(&path, llm).await {
            tracing::warn!("Error refining {}: {}", path.display(), e);
        }
    }
}

async fn refine_file(path: &Path, llm: &LlmClient) -> crate::error::Result<()> {
    let content = std::fs::read_to_string(path)?;
    let mut data: Value = serde_json::from_str(&content)?;
    if !data.is_object() {
        tracing::warn!("Skipping {}: not a JSON object", path.display());
        return Ok(());
    }

    let old_category = data["category"].as_str().unwrap_or_default().to_string();
    let title = data["title"].as_str().unwrap_or_default().to_string();

    let new_category = if needs_category_fix(&old_category) {
        let mapped = map_category(llm, &old_category, &title).await?;
        tracing::info!(
            "Remapped category for {}: {:?} -> {}",
            path.display(),
            old_category,
            mapped
        );
        mapped
    } else {
        old_category
    };

    apply_refinements(&mut data, &new_category, &today());

    std::fs::write(path, serde_json::to_string_pretty(&data)?)?;
    Ok(())
}

async fn map_category(llm: &LlmClient, old_category: &str, title: &str) -> crate::error::Result<String> {
    let prompt = format!(
        "You are a preprocessing model.\n\
         The given category is: \"{}\".\n\
         The title is: \"{}\".\n\n\
         Map this topic to the most relevant category from this list: {:?}.\n\
         Only respond with one category name from the list.",
        old_category, title, MAIN_CATEGORIES
    );

    let answer = llm.generate(None, &prompt).await?;
    let answer = answer.trim();

    // Guard against a chatty model: fall back to Technology on a response
    // outside the list.
    let mapped = MAIN_CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(answer))
        .copied()
        .unwrap_or("Technology");

    Ok(mapped.to_string())
}

pub fn needs_category_fix(category: &str) -> bool {
    category.is_empty()
        || !MAIN_CATEGORIES
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Set the category and default a missing/empty date.
pub fn apply_refinements(data: &mut Value, category: &str, default_date: &str) {
    data["category"] = Value::String(category.to_string());

    let date_missing = match data.get("date") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };
    if date_missing {
        data["date"] = Value::String(default_date.to_string());
    }
}

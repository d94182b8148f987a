use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::models::MarkPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_dir")]
    pub db_dir: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_seeds_path")]
    pub seeds_path: String,

    #[serde(default = "default_niches")]
    pub niches: Vec<String>,

    #[serde(default = "default_extract_limit")]
    pub extract_limit: usize,

    pub write_limit: Option<usize>,

    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    #[serde(default)]
    pub mark_policy: MarkPolicy,

    pub claude_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
}

fn data_dir() -> PathBuf {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("curiostack");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn default_db_dir() -> String {
    data_dir().join("database").to_string_lossy().to_string()
}

fn default_output_dir() -> String {
    data_dir().join("data").join("raw").to_string_lossy().to_string()
}

fn default_seeds_path() -> String {
    data_dir().join("urls.json").to_string_lossy().to_string()
}

fn default_niches() -> Vec<String> {
    vec![
        "ai_ml".to_string(),
        "cybersecurity".to_string(),
        "common_technology".to_string(),
        "data_science".to_string(),
    ]
}

fn default_extract_limit() -> usize {
    10
}

fn default_cooldown_secs() -> u64 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_dir: default_db_dir(),
            output_dir: default_output_dir(),
            seeds_path: default_seeds_path(),
            niches: default_niches(),
            extract_limit: default_extract_limit(),
            write_limit: None,
            cooldown_secs: default_cooldown_secs(),
            mark_policy: MarkPolicy::default(),
            claude_api_key: None,
            gemini_api_key: None,
            qdrant_url: None,
            qdrant_api_key: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("curiostack")
            .join("config.toml")
    }

    /// Path of the per-niche sqlite database.
    pub fn db_path(&self, niche: &str) -> PathBuf {
        PathBuf::from(&self.db_dir).join(format!("{}_web_sources.db", niche))
    }

    /// Directory where generated articles for a niche are written.
    pub fn niche_output_dir(&self, niche: &str) -> PathBuf {
        PathBuf::from(&self.output_dir).join(niche)
    }
}

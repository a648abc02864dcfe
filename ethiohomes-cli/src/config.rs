//! Launcher configuration loaded from an optional TOML file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ethiohomes_rag::{CallPolicy, OllamaConfig, RetrievalConfig};
use serde::Deserialize;

/// Everything needed to build the index and answer questions.
///
/// ```toml
/// data_path = "review.csv"
/// index_location = "./real_estate_index"
///
/// [ollama]
/// base_url = "http://localhost:11434"
/// generation_model = "llama3.2"
///
/// [retrieval]
/// k = 3
/// fetch_k = 20
/// diversity_weight = 0.7
///
/// [generation_policy]
/// timeout_ms = 120000
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// CSV listing table.
    pub data_path: PathBuf,
    /// Directory holding the persisted index.
    pub index_location: PathBuf,
    pub ollama: OllamaConfig,
    pub retrieval: RetrievalConfig,
    pub embedding_policy: CallPolicy,
    pub generation_policy: CallPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("review.csv"),
            index_location: PathBuf::from("./real_estate_index"),
            ollama: OllamaConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding_policy: CallPolicy::embedding(),
            generation_policy: CallPolicy::generation(),
        }
    }
}

impl AppConfig {
    /// Read `path`, or fall back to defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.retrieval.validate()?;
        config.embedding_policy.validate().context("invalid embedding_policy")?;
        config.generation_policy.validate().context("invalid generation_policy")?;
        Ok(config)
    }
}

//! Bankpilot configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankpilotConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

impl Default for BankpilotConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            budget: BudgetConfig::default(),
            ingest: IngestConfig::default(),
            knowledge: KnowledgeConfig::default(),
        }
    }
}

impl BankpilotConfig {
    /// Load config from the default path (~/.bankpilot/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::BankpilotError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::BankpilotError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::BankpilotError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Bankpilot home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bankpilot")
    }
}

/// Generation provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_endpoint() -> String { "https://api.openai.com/v1".into() }
fn default_model() -> String { "gpt-4o".into() }
fn default_temperature() -> f32 { 0.2 }
fn default_max_tokens() -> u32 { 1024 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embed_model")]
    pub model: String,
    /// Inputs longer than this are truncated before the embed call.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

fn default_embed_model() -> String { "text-embedding-3-small".into() }
fn default_max_input_chars() -> usize { 8_000 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embed_model(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidate window: how many of the newest chunks are scored per
    /// query. Bounds query cost and biases toward fresh content at the
    /// price of recall on very large corpora; re-check as the corpus
    /// grows.
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Unique citable sources per response.
    #[serde(default = "default_source_cap")]
    pub source_cap: usize,
    /// Total evidence characters, independent of token budgeting.
    #[serde(default = "default_evidence_char_cap")]
    pub evidence_char_cap: usize,
}

fn default_window() -> usize { 20_000 }
fn default_top_n() -> usize { 20 }
fn default_source_cap() -> usize { 20 }
fn default_evidence_char_cap() -> usize { 28_000 }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            top_n: default_top_n(),
            source_cap: default_source_cap(),
            evidence_char_cap: default_evidence_char_cap(),
        }
    }
}

/// Prompt token budget configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_token_ceiling")]
    pub token_ceiling: usize,
    /// Sub-budget for the user prompt alone; above it the caller is asked
    /// to compress instead of crowding out history and evidence.
    #[serde(default = "default_user_ceiling")]
    pub user_ceiling: usize,
}

fn default_token_ceiling() -> usize { 28_000 }
fn default_user_ceiling() -> usize { 8_000 }

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            token_ceiling: default_token_ceiling(),
            user_ceiling: default_user_ceiling(),
        }
    }
}

/// Ingestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_chunk_max_chars")]
    pub chunk_max_chars: usize,
    /// Concurrent in-flight embed calls.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Embed-call rate limit; 0 disables the limiter.
    #[serde(default = "default_embeds_per_minute")]
    pub embeds_per_minute: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

fn default_chunk_max_chars() -> usize { 1_000 }
fn default_concurrency() -> usize { 4 }
fn default_embeds_per_minute() -> u32 { 1_000 }
fn default_burst() -> u32 { 20 }

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_max_chars: default_chunk_max_chars(),
            concurrency: default_concurrency(),
            embeds_per_minute: default_embeds_per_minute(),
            burst: default_burst(),
        }
    }
}

/// Knowledge store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String { "~/.bankpilot/knowledge.db".into() }

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self { db_path: default_db_path() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BankpilotConfig::default();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.retrieval.window, 20_000);
        assert_eq!(config.budget.token_ceiling, 28_000);
        assert_eq!(config.ingest.chunk_max_chars, 1_000);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            api_key = "sk-test"

            [llm]
            model = "gpt-4o-mini"
            temperature = 0.5

            [retrieval]
            window = 500
            top_n = 5
        "#;

        let config: BankpilotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!((config.llm.temperature - 0.5).abs() < 0.01);
        assert_eq!(config.retrieval.window, 500);
        assert_eq!(config.retrieval.top_n, 5);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: BankpilotConfig = toml::from_str("").unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.budget.user_ceiling, 8_000);
        assert_eq!(config.ingest.burst, 20);
    }

    #[test]
    fn test_home_dir() {
        let home = BankpilotConfig::home_dir();
        assert!(home.to_string_lossy().contains("bankpilot"));
    }
}

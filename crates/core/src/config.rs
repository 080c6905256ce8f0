//! Configuration management for the docquery engine.
//!
//! This module handles loading and merging configuration from multiple
//! sources:
//! - Environment variables (`DOCQUERY_*`, provider API key variables)
//! - Config files (`docquery.yaml`, or the path in `DOCQUERY_CONFIG`)
//!
//! Environment variables override values from the config file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Main application configuration.
///
/// Holds the knobs shared by the retrieval engine and the
/// answer-generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Embedding provider (e.g., "gemini", "trigram")
    pub embedding_provider: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Embedding vector dimensions
    pub embedding_dimensions: usize,

    /// Chat provider for answer generation (e.g., "groq", "openai")
    pub chat_provider: String,

    /// Chat model identifier
    pub chat_model: String,

    /// API key for the embedding provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_api_key: Option<String>,

    /// API key for the chat provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_api_key: Option<String>,

    /// Chunking calibration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Log level override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,
}

/// Chunking calibration shared with the retrieval engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Overlap window carried between adjacent chunks, in characters
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,

    /// Minimum chunk length floor, in characters
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

fn default_max_chars() -> usize {
    500
}

fn default_overlap_chars() -> usize {
    50
}

fn default_min_chars() -> usize {
    20
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
            min_chars: default_min_chars(),
        }
    }
}

/// Config file structure.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    embedding: Option<EmbeddingSection>,
    chat: Option<ChatSection>,
    chunking: Option<ChunkingConfig>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatSection {
    provider: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            embedding_provider: "gemini".to_string(),
            embedding_model: "gemini-embedding-001".to_string(),
            embedding_dimensions: 768,
            chat_provider: "groq".to_string(),
            chat_model: "llama3-70b-8192".to_string(),
            embedding_api_key: None,
            chat_api_key: None,
            chunking: ChunkingConfig::default(),
            log_level: None,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `DOCQUERY_CONFIG`: Path to a YAML config file
    /// - `DOCQUERY_EMBEDDING_PROVIDER` / `DOCQUERY_EMBEDDING_MODEL`
    /// - `DOCQUERY_CHAT_PROVIDER` / `DOCQUERY_CHAT_MODEL`
    /// - `GEMINI_API_KEY`: Embedding provider key
    /// - `GROQ_API_KEY`: Chat provider key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        // YAML config file first, environment on top
        let config_path = std::env::var("DOCQUERY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("docquery.yaml"));

        if config_path.exists() {
            tracing::debug!("Merging config file {:?}", config_path);
            config = config.merge_yaml(&config_path)?;
        }

        if let Ok(provider) = std::env::var("DOCQUERY_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }

        if let Ok(model) = std::env::var("DOCQUERY_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }

        if let Ok(provider) = std::env::var("DOCQUERY_CHAT_PROVIDER") {
            config.chat_provider = provider;
        }

        if let Ok(model) = std::env::var("DOCQUERY_CHAT_MODEL") {
            config.chat_model = model;
        }

        config.embedding_api_key = std::env::var("GEMINI_API_KEY").ok();
        config.chat_api_key = std::env::var("GROQ_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(embedding) = config_file.embedding {
            if let Some(provider) = embedding.provider {
                result.embedding_provider = provider;
            }
            if let Some(model) = embedding.model {
                result.embedding_model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                result.embedding_dimensions = dimensions;
            }
        }

        if let Some(chat) = config_file.chat {
            if let Some(provider) = chat.provider {
                result.chat_provider = provider;
            }
            if let Some(model) = chat.model {
                result.chat_model = model;
            }
        }

        if let Some(chunking) = config_file.chunking {
            result.chunking = chunking;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Validate configuration for the active providers.
    pub fn validate(&self) -> AppResult<()> {
        let known_embedding = ["gemini", "trigram"];
        if !known_embedding.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                known_embedding.join(", ")
            )));
        }

        let known_chat = ["groq", "openai"];
        if !known_chat.contains(&self.chat_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown chat provider: {}. Supported: {}",
                self.chat_provider,
                known_chat.join(", ")
            )));
        }

        if self.embedding_provider == "gemini" && self.embedding_api_key.is_none() {
            return Err(AppError::Config(
                "Gemini embedding provider requires GEMINI_API_KEY".to_string(),
            ));
        }

        if self.chunking.max_chars == 0 {
            return Err(AppError::Config(
                "chunking.max_chars must be greater than zero".to_string(),
            ));
        }

        if self.chunking.overlap_chars >= self.chunking.max_chars {
            return Err(AppError::Config(format!(
                "chunking.overlap_chars ({}) must be smaller than max_chars ({})",
                self.chunking.overlap_chars, self.chunking.max_chars
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.embedding_provider, "gemini");
        assert_eq!(config.embedding_dimensions, 768);
        assert_eq!(config.chat_provider, "groq");
        assert_eq!(config.chunking.max_chars, 500);
        assert_eq!(config.chunking.overlap_chars, 50);
        assert!(!config.no_color);
    }

    #[test]
    fn test_merge_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docquery.yaml");
        std::fs::write(
            &path,
            r#"
embedding:
  provider: trigram
  model: trigram-v1
  dimensions: 384
chunking:
  max_chars: 300
  overlap_chars: 30
  min_chars: 10
logging:
  level: debug
  color: false
"#,
        )
        .unwrap();

        let config = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(config.embedding_provider, "trigram");
        assert_eq!(config.embedding_dimensions, 384);
        assert_eq!(config.chunking.max_chars, 300);
        assert_eq!(config.log_level, Some("debug".to_string()));
        assert!(config.no_color);
        // Untouched sections keep their defaults
        assert_eq!(config.chat_provider, "groq");
    }

    #[test]
    fn test_merge_yaml_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docquery.yaml");
        std::fs::write(&path, "embedding: [not, a, mapping]").unwrap();

        let result = AppConfig::default().merge_yaml(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_unknown_embedding_provider() {
        let mut config = AppConfig::default();
        config.embedding_provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_overlap_must_fit() {
        let mut config = AppConfig::default();
        config.embedding_provider = "trigram".to_string();
        config.chunking.overlap_chars = config.chunking.max_chars;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_trigram_needs_no_key() {
        let mut config = AppConfig::default();
        config.embedding_provider = "trigram".to_string();
        assert!(config.validate().is_ok());
    }
}

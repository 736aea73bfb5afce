use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SymError};
use crate::types::DEFAULT_NAMESPACE;

/// Top-level configuration for the SYM feedback backend.
///
/// Loaded from `~/.sym/config.toml` by default. API keys are never stored
/// here; each section that talks to a hosted service names the environment
/// variable holding its key instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl SymConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SymConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults only if
    /// the file does not exist. A file that is present but malformed or
    /// out of range is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("No config file at {}. Using defaults.", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Reject values that would make every call fail or every search miss.
    pub fn validate(&self) -> Result<()> {
        let t = &self.timeouts;
        for (name, secs) in [
            ("transcription_secs", t.transcription_secs),
            ("classification_secs", t.classification_secs),
            ("embedding_secs", t.embedding_secs),
            ("vector_secs", t.vector_secs),
            ("generation_secs", t.generation_secs),
        ] {
            if secs == 0 {
                return Err(SymError::Config(format!("timeouts.{} must be at least 1", name)));
            }
        }
        if self.vector.top_k == 0 {
            return Err(SymError::Config("vector.top_k must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.vector.similarity_threshold) {
            return Err(SymError::Config(format!(
                "vector.similarity_threshold must be within [0, 1], got {}",
                self.vector.similarity_threshold
            )));
        }
        Ok(())
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Read a secret from the environment variable named by `var`.
pub fn secret_from_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SymError::Config(format!("{} not set", var))),
    }
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database and transcript artifacts.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP listen port.
    pub port: u16,
    /// HTTP listen address.
    pub bind_address: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.sym/data".to_string(),
            log_level: "info".to_string(),
            port: 8000,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

/// HTTP surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
    /// Maximum accepted audio upload size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["https://clockdesign.com.br".to_string()],
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

/// OpenAI-compatible endpoints used for chat, embeddings and transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Model used by the sentiment classifier.
    pub chat_model: String,
    /// Model used for report narratives.
    pub report_model: String,
    pub embedding_model: String,
    pub transcription_model: String,
    pub classifier_temperature: f32,
    pub report_temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            report_model: "gpt-4-turbo".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            transcription_model: "whisper-1".to_string(),
            classifier_temperature: 0.0,
            report_temperature: 0.2,
        }
    }
}

/// Which vector store implementation backs the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackendKind {
    /// In-process cosine index, journaled to the SQLite database.
    Memory,
    /// Pinecone data-plane API.
    Pinecone,
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub backend: VectorBackendKind,
    /// Data-plane host of the Pinecone index (e.g. `https://sym-comentarios-xxxx.svc.pinecone.io`).
    pub index_host: String,
    pub api_key_env: String,
    pub namespace: String,
    pub dimension: usize,
    /// Nearest neighbours retrieved for report synthesis.
    pub top_k: usize,
    /// Minimum cosine similarity (inclusive) for a hit to be used.
    pub similarity_threshold: f64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackendKind::Memory,
            index_host: String::new(),
            api_key_env: "PINECONE_API_KEY".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            dimension: 1536,
            top_k: 3,
            similarity_threshold: 0.8,
        }
    }
}

/// Relational store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file name, relative to `general.data_dir`.
    pub database_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: "sym.db".to_string(),
        }
    }
}

/// How failures in enrichment steps are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMode {
    /// Enrichment failures are logged and absorbed; the stores may drift apart.
    #[default]
    BestEffort,
    /// Every step is required; the first failure aborts the call.
    Strict,
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub consistency: ConsistencyMode,
    /// Directory for uploaded audio and transcript side artifacts,
    /// relative to `general.data_dir` unless absolute.
    pub transcripts_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            consistency: ConsistencyMode::BestEffort,
            transcripts_dir: "temp_files".to_string(),
        }
    }
}

/// Per-collaborator call timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub transcription_secs: u64,
    pub classification_secs: u64,
    pub embedding_secs: u64,
    pub vector_secs: u64,
    pub generation_secs: u64,
}

impl TimeoutConfig {
    pub fn transcription(&self) -> Duration {
        Duration::from_secs(self.transcription_secs)
    }

    pub fn classification(&self) -> Duration {
        Duration::from_secs(self.classification_secs)
    }

    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_secs)
    }

    pub fn vector(&self) -> Duration {
        Duration::from_secs(self.vector_secs)
    }

    pub fn generation(&self) -> Duration {
        Duration::from_secs(self.generation_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            transcription_secs: 120,
            classification_secs: 30,
            embedding_secs: 30,
            vector_secs: 15,
            generation_secs: 90,
        }
    }
}

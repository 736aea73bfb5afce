use thiserror::Error;

/// Top-level error type for the SYM feedback system.
///
/// Every collaborator adapter (record store, vector store, embedding,
/// speech-to-text, language model) maps its native errors into one of these
/// variants so that pipeline steps can be classified uniformly.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SymError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Namespace error: namespace '{0}' not found in vector store")]
    Namespace(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The vector entry is missing after the relational side was already
    /// written. Kept apart from `NotFound` so callers can tell the two
    /// outcomes apart.
    #[error("Vector entry not found: {0}")]
    VectorNotFound(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Timed out after {limit_ms}ms: {operation}")]
    Timeout { operation: String, limit_ms: u64 },

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SymError {
    /// Stable machine-readable code for this error, used in JSON payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            SymError::Config(_) => "config_error",
            SymError::Validation(_) => "bad_request",
            SymError::Transcription(_) => "transcription_error",
            SymError::Classification(_) => "classification_error",
            SymError::Storage(_) => "store_error",
            SymError::Namespace(_) => "namespace_error",
            SymError::NotFound(_) => "not_found",
            SymError::VectorNotFound(_) => "vector_not_found",
            SymError::Embedding(_) => "embedding_error",
            SymError::Generation(_) => "generation_error",
            SymError::Timeout { .. } => "timeout",
            SymError::Api(_) => "api_error",
            SymError::Io(_) => "io_error",
            SymError::Serialization(_) => "serialization_error",
        }
    }
}

impl From<toml::de::Error> for SymError {
    fn from(err: toml::de::Error) -> Self {
        SymError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SymError {
    fn from(err: toml::ser::Error) -> Self {
        SymError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SymError {
    fn from(err: serde_json::Error) -> Self {
        SymError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for SYM operations.
pub type Result<T> = std::result::Result<T, SymError>;

//! SYM Whisper crate - speech-to-text transcription service.
//!
//! Provides a trait-based abstraction over speech-to-text, an HTTP client
//! for OpenAI-compatible Whisper endpoints, a mock implementation for tests
//! and `--mock-services`, and the on-disk archive for uploaded audio and
//! its transcript.

pub mod archive;
pub mod whisper_service;

use async_trait::async_trait;

use sym_core::error::{Result, SymError};

pub use archive::{sanitize_filename, ArchivedUpload, TranscriptArchive};
pub use whisper_service::WhisperService;

// =============================================================================
// Trait
// =============================================================================

/// Service for transcribing audio to text.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribe an encoded audio file (mp3, wav, m4a, ...).
    ///
    /// `filename` is passed through to the backend, which uses its
    /// extension to detect the container format.
    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<String>;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock transcription service that returns a fixed transcript.
#[derive(Debug, Clone)]
pub struct MockTranscriptionService {
    text: String,
}

impl MockTranscriptionService {
    pub fn new() -> Self {
        Self {
            text: "[mock transcription]".to_string(),
        }
    }

    /// Return `text` for every non-empty input.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Default for MockTranscriptionService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptionService for MockTranscriptionService {
    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<String> {
        if audio.is_empty() {
            return Err(SymError::Transcription(
                "Cannot transcribe empty audio data".to_string(),
            ));
        }

        tracing::debug!(bytes = audio.len(), filename, "Mock transcription generated");
        Ok(self.text.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================

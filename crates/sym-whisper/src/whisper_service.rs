//! Whisper transcription over an OpenAI-compatible HTTP API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use sym_core::config::OpenAiConfig;
use sym_core::error::{Result, SymError};

use crate::TranscriptionService;

/// Client for `POST {base_url}/audio/transcriptions`.
pub struct WhisperService {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl WhisperService {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Build from the `[openai]` section, reading the key from the environment.
    pub fn from_config(config: &OpenAiConfig) -> Result<Self> {
        let api_key = sym_core::config::secret_from_env(&config.api_key_env)?;
        Ok(Self::new(
            &config.base_url,
            api_key,
            &config.transcription_model,
        ))
    }
}

impl std::fmt::Debug for WhisperService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperService")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait]
impl TranscriptionService for WhisperService {
    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<String> {
        if audio.is_empty() {
            return Err(SymError::Transcription(
                "Cannot transcribe empty audio data".to_string(),
            ));
        }

        let part = Part::bytes(audio.to_vec()).file_name(filename.to_string());
        let form = Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        tracing::info!(filename, bytes = audio.len(), model = %self.model, "Sending audio for transcription");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SymError::Transcription(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SymError::Transcription(format!(
                "Transcription API error ({}): {}",
                status, body
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| SymError::Transcription(format!("Malformed response: {}", e)))?;

        Ok(parsed.text)
    }
}

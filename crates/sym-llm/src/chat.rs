//! Chat-completion clients.
//!
//! - `OpenAiChat` calls an OpenAI-compatible `/chat/completions` endpoint.
//! - `MockLanguageModel` answers from canned rules and records prompts.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sym_core::config::OpenAiConfig;
use sym_core::error::{Result, SymError};

use crate::LanguageModel;

// ---------------------------------------------------------------------------
// OpenAiChat
// ---------------------------------------------------------------------------

/// One model at one temperature behind an OpenAI-compatible API.
pub struct OpenAiChat {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        }
    }

    /// Client for sentiment classification (`chat_model`, `classifier_temperature`).
    pub fn classifier_from_config(config: &OpenAiConfig) -> Result<Self> {
        let api_key = sym_core::config::secret_from_env(&config.api_key_env)?;
        Ok(Self::new(
            &config.base_url,
            api_key,
            &config.chat_model,
            config.classifier_temperature,
        ))
    }

    /// Client for report narratives (`report_model`, `report_temperature`).
    pub fn reporter_from_config(config: &OpenAiConfig) -> Result<Self> {
        let api_key = sym_core::config::secret_from_env(&config.api_key_env)?;
        Ok(Self::new(
            &config.base_url,
            api_key,
            &config.report_model,
            config.report_temperature,
        ))
    }
}

impl std::fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SymError::Generation(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SymError::Generation(format!(
                "Chat API error ({}): {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SymError::Generation(format!("Malformed response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SymError::Generation("Empty completion".to_string()))?;

        debug!(model = %self.model, chars = content.len(), "Completion received");
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// MockLanguageModel
// ---------------------------------------------------------------------------

/// Deterministic language model for tests and `--mock-services`.
///
/// The first rule whose needle occurs in the prompt wins; otherwise the
/// default reply is returned. Every prompt is recorded.
#[derive(Debug, Default)]
pub struct MockLanguageModel {
    rules: Vec<(String, String)>,
    default_reply: String,
    failure: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLanguageModel {
    /// Always reply with `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            default_reply: reply.into(),
            ..Self::default()
        }
    }

    /// Always fail with `SymError::Generation(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Reply with `reply` whenever the prompt contains `needle`.
    pub fn with_rule(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((needle.into(), reply.into()));
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(message) = &self.failure {
            return Err(SymError::Generation(message.clone()));
        }
        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default_reply.clone());
        Ok(reply)
    }
}

//! SYM LLM crate - generative-language client and sentiment classifier.

pub mod chat;
pub mod classifier;

use async_trait::async_trait;

use sym_core::error::Result;

pub use chat::{MockLanguageModel, OpenAiChat};
pub use classifier::{classification_prompt, normalize_label, SentimentClassifier};

/// Single-turn text generation: prompt in, free-form text out.
///
/// Replies are non-deterministic and carry no format guarantee beyond what
/// the prompt asks for.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

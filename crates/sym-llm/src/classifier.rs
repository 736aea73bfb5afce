//! Sentiment classification over a generative language model.
//!
//! The model reply is free text. It is mapped onto the closed label set by
//! [`normalize_label`]; anything unrecognised becomes `Undefined`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use sym_core::bounded;
use sym_core::types::Sentiment;

use crate::LanguageModel;

/// Fixed classification instruction sent to the model.
pub fn classification_prompt(text: &str) -> String {
    format!(
        "Leia e classifique o seguinte texto: {} como: 'positivo', 'negativo' ou 'neutro'. Responda em português",
        text
    )
}

/// Map a raw model reply onto a sentiment label.
///
/// Lower-cases, trims surrounding whitespace, then strips trailing `.`, `,`,
/// `!` and `?`, in that order, and matches the result exactly.
pub fn normalize_label(raw: &str) -> Sentiment {
    let lowered = raw.to_lowercase();
    let cleaned = lowered.trim().trim_end_matches(['.', ',', '!', '?']);
    match cleaned {
        "positivo" | "positive" => Sentiment::Positive,
        "negativo" | "negative" => Sentiment::Negative,
        "neutro" | "neutral" => Sentiment::Neutral,
        _ => Sentiment::Undefined,
    }
}

/// Classifies feedback text. Never fails: model errors and timeouts degrade
/// to `Sentiment::Undefined`.
#[derive(Clone)]
pub struct SentimentClassifier {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl SentimentClassifier {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub async fn classify(&self, text: &str) -> Sentiment {
        let prompt = classification_prompt(text);
        match bounded("classification", self.timeout, self.model.generate(&prompt)).await {
            Ok(reply) => {
                let sentiment = normalize_label(&reply);
                debug!(reply = %reply.trim(), sentiment = %sentiment, "Classifier reply normalized");
                sentiment
            }
            Err(e) => {
                warn!(error = %e, "Classification failed, falling back to undefined");
                Sentiment::Undefined
            }
        }
    }
}

impl std::fmt::Debug for SentimentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentClassifier")
            .field("timeout", &self.timeout)
            .finish()
    }
}

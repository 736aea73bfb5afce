//! Feedback ingestion pipeline.
//!
//! `analyze` creates a record, classifies it and persists its vector.
//! `enrich` later attaches customer details to both stores. The relational
//! store is the source of truth; no call ever rolls back a relational write
//! because a later vector step failed.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use sym_core::bounded;
use sym_core::config::TimeoutConfig;
use sym_core::error::{Result, SymError};
use sym_core::types::{metadata_keys, CustomerDetails, Metadata, Sentiment};
use sym_llm::SentimentClassifier;
use sym_storage::RecordStore;
use sym_vector::{EmbeddingService, VectorStoreAdapter};
use sym_whisper::TranscriptionService;

use crate::policy::{PolicyTable, Step, StepPolicy};

/// A best-effort step that failed without aborting the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: Step,
    /// Machine-readable error code (`SymError::kind`).
    pub error: String,
    pub message: String,
}

impl StepFailure {
    fn new(step: Step, err: &SymError) -> Self {
        Self {
            step,
            error: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result of `analyze`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub record_id: i64,
    pub sentiment: Sentiment,
    pub transcript: String,
    /// False when the embedding or the vector upsert failed.
    pub vector_persisted: bool,
    pub warnings: Vec<StepFailure>,
}

/// Result of `enrich`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentOutcome {
    pub record_id: i64,
    pub vector_updated: bool,
    pub vector_error: Option<StepFailure>,
}

/// The feedback ingestion pipeline.
pub struct FeedbackPipeline {
    records: Arc<dyn RecordStore>,
    vectors: VectorStoreAdapter,
    classifier: SentimentClassifier,
    embedder: Arc<dyn EmbeddingService>,
    transcriber: Arc<dyn TranscriptionService>,
    policy: PolicyTable,
    timeouts: TimeoutConfig,
}

impl FeedbackPipeline {
    pub fn new(
        records: Arc<dyn RecordStore>,
        vectors: VectorStoreAdapter,
        classifier: SentimentClassifier,
        embedder: Arc<dyn EmbeddingService>,
        transcriber: Arc<dyn TranscriptionService>,
        policy: PolicyTable,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            records,
            vectors,
            classifier,
            embedder,
            transcriber,
            policy,
            timeouts,
        }
    }

    /// Speech-to-text only. An empty transcript counts as a failure.
    pub async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<String> {
        let transcript = bounded(
            "transcription",
            self.timeouts.transcription(),
            self.transcriber.transcribe(audio, filename),
        )
        .await
        .inspect_err(|e| error!(step = ?Step::Transcribe, error = %e, filename, "Transcription failed"))?;

        if transcript.trim().is_empty() {
            error!(step = ?Step::Transcribe, filename, "Transcription returned no text");
            return Err(SymError::Transcription("empty transcript".to_string()));
        }
        Ok(transcript)
    }

    /// Analyze an audio file: transcribe, then run `analyze` on the text.
    ///
    /// A transcription failure aborts before any record is created.
    pub async fn analyze_audio(&self, audio: &[u8], filename: &str) -> Result<AnalysisOutcome> {
        let transcript = self.transcribe(audio, filename).await?;
        self.analyze(&transcript).await
    }

    /// Analyze a transcript.
    pub async fn analyze(&self, transcript: &str) -> Result<AnalysisOutcome> {
        if transcript.trim().is_empty() {
            return Err(SymError::Validation("transcription must not be empty".to_string()));
        }

        let record_id = self
            .records
            .create_comment(transcript)
            .inspect_err(|e| error!(step = ?Step::CreateComment, error = %e, "Comment creation failed"))?;
        debug!(record_id, "Comment created");

        let mut warnings = Vec::new();

        let sentiment = self.classifier.classify(transcript).await;

        if let Err(e) = self.records.set_sentiment(record_id, sentiment) {
            self.absorb(Step::SetSentiment, record_id, e, &mut warnings)?;
        }

        let vector_persisted = match self.persist_vector(record_id, transcript, sentiment).await {
            Ok(()) => true,
            Err((step, e)) => {
                self.absorb(step, record_id, e, &mut warnings)?;
                false
            }
        };

        info!(
            record_id,
            sentiment = %sentiment,
            vector_persisted,
            warnings = warnings.len(),
            "Feedback analyzed"
        );

        Ok(AnalysisOutcome {
            record_id,
            sentiment,
            transcript: transcript.to_string(),
            vector_persisted,
            warnings,
        })
    }

    /// Attach customer details to a record in both stores.
    ///
    /// Zero affected relational rows means the record does not exist: the
    /// call fails with `NotFound` and the vector store is not touched. A
    /// vector-side failure never undoes the relational update.
    pub async fn enrich(&self, record_id: i64, details: &CustomerDetails) -> Result<EnrichmentOutcome> {
        let rows = self
            .records
            .set_customer_details(record_id, details)
            .inspect_err(|e| {
                error!(step = ?Step::SetCustomerDetails, record_id, error = %e, "Customer detail update failed")
            })?;
        if rows == 0 {
            warn!(record_id, "Enrichment target does not exist");
            return Err(SymError::NotFound(format!("record {}", record_id)));
        }

        let id = record_id.to_string();
        match self.vectors.update_metadata_only(&id, details.to_metadata()).await {
            Ok(()) => {
                info!(record_id, "Record enriched in both stores");
                Ok(EnrichmentOutcome {
                    record_id,
                    vector_updated: true,
                    vector_error: None,
                })
            }
            Err(e) => {
                let mut warnings = Vec::new();
                self.absorb(Step::VectorMetadataUpdate, record_id, e, &mut warnings)
                    .map_err(|e| match e {
                        SymError::NotFound(msg) => SymError::VectorNotFound(format!(
                            "{}; relational update of record {} was applied",
                            msg, record_id
                        )),
                        other => other,
                    })?;
                Ok(EnrichmentOutcome {
                    record_id,
                    vector_updated: false,
                    vector_error: warnings.pop(),
                })
            }
        }
    }

    async fn persist_vector(
        &self,
        record_id: i64,
        transcript: &str,
        sentiment: Sentiment,
    ) -> std::result::Result<(), (Step, SymError)> {
        let values = bounded(
            "embedding",
            self.timeouts.embedding(),
            self.embedder.embed(transcript),
        )
        .await
        .map_err(|e| (Step::Embed, e))?;

        let mut metadata = Metadata::new();
        metadata.insert(metadata_keys::COMMENT.into(), transcript.into());
        metadata.insert(metadata_keys::SENTIMENT.into(), sentiment.as_str().into());
        metadata.insert(metadata_keys::TIMESTAMP.into(), Utc::now().to_rfc3339().into());

        self.vectors
            .upsert(&record_id.to_string(), values, metadata)
            .await
            .map_err(|e| (Step::VectorUpsert, e))
    }

    /// Apply the step policy to a failure: Required propagates it,
    /// BestEffort logs it and records it in `warnings`.
    fn absorb(
        &self,
        step: Step,
        record_id: i64,
        err: SymError,
        warnings: &mut Vec<StepFailure>,
    ) -> Result<()> {
        match self.policy.policy(step) {
            StepPolicy::Required => {
                error!(step = ?step, record_id, error = %err, "Required step failed");
                Err(err)
            }
            StepPolicy::BestEffort => {
                warn!(step = ?step, record_id, error = %err, "Best-effort step failed");
                warnings.push(StepFailure::new(step, &err));
                Ok(())
            }
        }
    }
}

//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use sym_core::config::SymConfig;
use sym_ingest::FeedbackPipeline;
use sym_insight::ReportSynthesizer;
use sym_storage::{AggregateStore, FeedbackRepository};
use sym_whisper::TranscriptArchive;

/// Shared application state.
///
/// Every service handle is constructed once at startup and shared by
/// reference; handlers hold no mutable state of their own.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SymConfig>,
    /// Ingestion pipeline (transcribe, analyze, enrich).
    pub pipeline: Arc<FeedbackPipeline>,
    pub reports: Arc<ReportSynthesizer>,
    /// Dashboard aggregates.
    pub aggregates: Arc<dyn AggregateStore>,
    /// Direct record access for health reporting.
    pub records: Arc<FeedbackRepository>,
    /// Where uploaded audio and its transcript are kept.
    pub archive: TranscriptArchive,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: SymConfig,
        pipeline: FeedbackPipeline,
        reports: ReportSynthesizer,
        aggregates: Arc<dyn AggregateStore>,
        records: Arc<FeedbackRepository>,
        archive: TranscriptArchive,
    ) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            reports: Arc::new(reports),
            aggregates,
            records,
            archive,
            start_time: Instant::now(),
        }
    }
}

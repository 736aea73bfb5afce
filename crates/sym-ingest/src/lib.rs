//! SYM Ingest crate - the feedback ingestion pipeline.
//!
//! Orchestrates transcript, record creation, classification, embedding and
//! vector persistence, then later enrichment of both stores. Which step
//! failures abort a call and which are absorbed is decided by the
//! [`PolicyTable`], not by the steps themselves.

pub mod pipeline;
pub mod policy;

pub use pipeline::{AnalysisOutcome, EnrichmentOutcome, FeedbackPipeline, StepFailure};
pub use policy::{PolicyTable, Step, StepPolicy};

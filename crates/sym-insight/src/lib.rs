//! SYM Insight crate - narrative report synthesis.
//!
//! Combines the per-unit sentiment aggregate from the relational store with
//! semantically similar feedback from the vector store, and asks the
//! language model for two independent analyses:
//! - goals versus the aggregate summary
//! - the aggregate summary versus the retrieved examples

pub mod prompts;
pub mod report;

pub use report::{ReportSynthesizer, GOALS_HEADER, MARKET_HEADER};

//! SYM Storage crate - SQLite persistence for feedback records.
//!
//! Provides a WAL-mode SQLite database with migrations, the record
//! repository used by the ingestion pipeline, the aggregate queries
//! behind the dashboard and report endpoints, and the table that keeps the
//! in-memory vector index across restarts.

pub mod db;
pub mod migrations;
pub mod queries;
pub mod repository;
pub mod vectors;

pub use db::Database;
pub use queries::{AggregateQueries, AggregateStore};
pub use repository::{FeedbackRepository, RecordStore};
pub use vectors::{StoredVector, VectorEntryRepository};

//! Feedback record repository.
//!
//! `RecordStore` is the write-side contract the ingestion pipeline depends
//! on; `FeedbackRepository` implements it over the shared SQLite database.

use std::sync::Arc;

use chrono::{NaiveDateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use tracing::debug;

use sym_core::error::{Result, SymError};
use sym_core::types::{CustomerDetails, FeedbackRecord, Sentiment};

use crate::db::Database;

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Typed write operations over the relational store.
pub trait RecordStore: Send + Sync {
    /// Insert a new comment and return its store-assigned id.
    fn create_comment(&self, text: &str) -> Result<i64>;

    /// Overwrite the sentiment of an existing record.
    fn set_sentiment(&self, id: i64, sentiment: Sentiment) -> Result<()>;

    /// Set the customer-detail columns and return the number of rows
    /// affected. Zero means no record has this id; callers decide what that
    /// means.
    fn set_customer_details(&self, id: i64, details: &CustomerDetails) -> Result<usize>;
}

/// SQLite-backed feedback repository.
pub struct FeedbackRepository {
    db: Arc<Database>,
}

impl FeedbackRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Find a record by id.
    pub fn find_by_id(&self, id: i64) -> Result<Option<FeedbackRecord>> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, comment_text, sentiment, customer_name, email, unit, created_at
                     FROM feedback_records WHERE id = ?1",
                    rusqlite::params![id],
                    |row| {
                        Ok(RawRecord {
                            id: row.get(0)?,
                            comment_text: row.get(1)?,
                            sentiment: row.get(2)?,
                            customer_name: row.get(3)?,
                            email: row.get(4)?,
                            unit: row.get(5)?,
                            created_at: row.get(6)?,
                        })
                    },
                )
                .optional()
                .map_err(|e| SymError::Storage(format!("Failed to fetch record {}: {}", id, e)))?;

            row.map(RawRecord::into_record).transpose()
        })
    }

    /// Total number of records.
    pub fn count(&self) -> Result<i64> {
        self.db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM feedback_records", [], |row| row.get(0))
                .map_err(|e| SymError::Storage(format!("Failed to count records: {}", e)))
        })
    }
}

impl RecordStore for FeedbackRepository {
    fn create_comment(&self, text: &str) -> Result<i64> {
        let created_at = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO feedback_records (comment_text, created_at) VALUES (?1, ?2)",
                rusqlite::params![text, created_at],
            )
            .map_err(|e| SymError::Storage(format!("Failed to insert comment: {}", e)))?;
            let id = conn.last_insert_rowid();
            debug!(record_id = id, "Comment row created");
            Ok(id)
        })
    }

    fn set_sentiment(&self, id: i64, sentiment: Sentiment) -> Result<()> {
        self.db.with_conn(|conn| {
            let rows = conn
                .execute(
                    "UPDATE feedback_records SET sentiment = ?1 WHERE id = ?2",
                    rusqlite::params![sentiment.as_str(), id],
                )
                .map_err(|e| SymError::Storage(format!("Failed to update sentiment: {}", e)))?;
            if rows == 0 {
                return Err(SymError::NotFound(format!("record {}", id)));
            }
            Ok(())
        })
    }

    fn set_customer_details(&self, id: i64, details: &CustomerDetails) -> Result<usize> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE feedback_records SET customer_name = ?1, email = ?2, unit = ?3 WHERE id = ?4",
                rusqlite::params![details.name, details.email, details.unit, id],
            )
            .map_err(|e| SymError::Storage(format!("Failed to update customer details: {}", e)))
        })
    }
}

struct RawRecord {
    id: i64,
    comment_text: String,
    sentiment: Option<String>,
    customer_name: Option<String>,
    email: Option<String>,
    unit: Option<String>,
    created_at: String,
}

impl RawRecord {
    fn into_record(self) -> Result<FeedbackRecord> {
        let sentiment = self
            .sentiment
            .as_deref()
            .map(str::parse::<Sentiment>)
            .transpose()
            .map_err(|e| SymError::Storage(format!("Corrupt sentiment in record {}: {}", self.id, e)))?;
        let naive = NaiveDateTime::parse_from_str(&self.created_at, TIMESTAMP_FORMAT)
            .map_err(|e| SymError::Storage(format!("Corrupt timestamp in record {}: {}", self.id, e)))?;

        Ok(FeedbackRecord {
            id: self.id,
            comment_text: self.comment_text,
            sentiment,
            customer_name: self.customer_name,
            email: self.email,
            unit: self.unit,
            created_at: Utc.from_utc_datetime(&naive),
        })
    }
}

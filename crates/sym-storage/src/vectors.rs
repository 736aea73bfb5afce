//! Durable vector entries.
//!
//! The in-memory vector index writes through to this table and reloads it
//! at startup, so entries survive a restart.

use std::sync::Arc;

use tracing::debug;

use sym_core::error::{Result, SymError};
use sym_core::types::Metadata;

use crate::db::Database;

/// One persisted vector entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVector {
    pub namespace: String,
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Metadata,
}

/// SQLite-backed storage for vector entries.
#[derive(Debug)]
pub struct VectorEntryRepository {
    db: Arc<Database>,
}

impl VectorEntryRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or overwrite an entry.
    pub fn upsert(&self, namespace: &str, id: &str, values: &[f32], metadata: &Metadata) -> Result<()> {
        let values_json = serde_json::to_string(values)?;
        let metadata_json = serde_json::to_string(metadata)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO vector_entries (namespace, id, vector_values, metadata)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (namespace, id)
                 DO UPDATE SET vector_values = excluded.vector_values, metadata = excluded.metadata",
                rusqlite::params![namespace, id, values_json, metadata_json],
            )
            .map_err(|e| SymError::Storage(format!("Failed to persist vector {}: {}", id, e)))?;
            debug!(namespace, id, "Vector entry persisted");
            Ok(())
        })
    }

    /// Replace the metadata of an existing entry. Values are untouched.
    pub fn replace_metadata(&self, namespace: &str, id: &str, metadata: &Metadata) -> Result<()> {
        let metadata_json = serde_json::to_string(metadata)?;
        self.db.with_conn(|conn| {
            let rows = conn
                .execute(
                    "UPDATE vector_entries SET metadata = ?1 WHERE namespace = ?2 AND id = ?3",
                    rusqlite::params![metadata_json, namespace, id],
                )
                .map_err(|e| {
                    SymError::Storage(format!("Failed to update vector metadata {}: {}", id, e))
                })?;
            if rows == 0 {
                return Err(SymError::NotFound(format!("vector entry {}", id)));
            }
            Ok(())
        })
    }

    /// Every persisted entry, across all namespaces.
    pub fn load_all(&self) -> Result<Vec<StoredVector>> {
        let rows = self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT namespace, id, vector_values, metadata FROM vector_entries")
                .map_err(|e| SymError::Storage(format!("Failed to prepare vector load: {}", e)))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })
                .map_err(|e| SymError::Storage(format!("Failed to load vectors: {}", e)))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| SymError::Storage(format!("Failed to read vector row: {}", e)))?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(namespace, id, values, metadata)| {
                Ok(StoredVector {
                    namespace,
                    id,
                    values: serde_json::from_str(&values)?,
                    metadata: serde_json::from_str(&metadata)?,
                })
            })
            .collect()
    }
}

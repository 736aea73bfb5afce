//! Raw vector backend contract and the in-memory cosine index.
//!
//! The in-memory index is brute-force: every query is O(n) over the
//! namespace. Built with [`VectorIndex::persistent`] it writes through to
//! SQLite and reloads its entries at startup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use sym_core::error::{Result, SymError};
use sym_core::types::Metadata;
use sym_storage::VectorEntryRepository;

/// A single hit returned from a vector query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    /// Cosine similarity score.
    pub score: f64,
    pub metadata: Metadata,
}

/// Operations a vector store backend must provide. Backends do not enforce
/// namespace presence or existence preconditions; the adapter does.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Names of all namespaces currently present in the index.
    async fn list_namespaces(&self) -> Result<Vec<String>>;

    /// Insert or overwrite an entry.
    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        values: Vec<f32>,
        metadata: Metadata,
    ) -> Result<()>;

    /// Point fetch. True if an entry with this id exists in the namespace.
    async fn fetch_exists(&self, namespace: &str, id: &str) -> Result<bool>;

    /// Merge `patch` into the entry's metadata. Values are untouched.
    async fn update_metadata(&self, namespace: &str, id: &str, patch: Metadata) -> Result<()>;

    /// Return the `top_k` nearest entries by cosine similarity, best first.
    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize)
        -> Result<Vec<SearchHit>>;
}

#[derive(Debug, Clone)]
struct VectorEntry {
    values: Vec<f32>,
    metadata: Metadata,
}

type Namespaces = HashMap<String, HashMap<String, VectorEntry>>;

/// In-memory vector index partitioned by namespace.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    namespaces: Arc<RwLock<Namespaces>>,
    /// Write-through store; `None` keeps entries in memory only.
    journal: Option<Arc<VectorEntryRepository>>,
}

impl VectorIndex {
    /// Create a new index with no namespaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory index with `namespace` already provisioned.
    pub fn with_namespace(namespace: &str) -> Self {
        let mut namespaces = Namespaces::new();
        namespaces.insert(namespace.to_string(), HashMap::new());
        Self {
            namespaces: Arc::new(RwLock::new(namespaces)),
            journal: None,
        }
    }

    /// Create an index backed by `journal`, reloading every stored entry
    /// and provisioning `namespace`.
    pub fn persistent(journal: Arc<VectorEntryRepository>, namespace: &str) -> Result<Self> {
        let mut namespaces = Namespaces::new();
        namespaces.insert(namespace.to_string(), HashMap::new());

        let stored = journal.load_all()?;
        let loaded = stored.len();
        for entry in stored {
            namespaces.entry(entry.namespace).or_default().insert(
                entry.id,
                VectorEntry {
                    values: entry.values,
                    metadata: entry.metadata,
                },
            );
        }
        info!(loaded, namespace, "Vector index reloaded from storage");

        Ok(Self {
            namespaces: Arc::new(RwLock::new(namespaces)),
            journal: Some(journal),
        })
    }

    /// Provision an empty namespace. No-op if it already exists.
    pub fn create_namespace(&self, namespace: &str) -> Result<()> {
        self.write()?.entry(namespace.to_string()).or_default();
        Ok(())
    }

    /// Number of entries in a namespace.
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .map(|g| g.get(namespace).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    /// Metadata of one entry, if present.
    pub fn metadata(&self, namespace: &str, id: &str) -> Option<Metadata> {
        self.namespaces
            .read()
            .ok()?
            .get(namespace)?
            .get(id)
            .map(|e| e.metadata.clone())
    }

    /// Stored values of one entry, if present.
    pub fn values(&self, namespace: &str, id: &str) -> Option<Vec<f32>> {
        self.namespaces
            .read()
            .ok()?
            .get(namespace)?
            .get(id)
            .map(|e| e.values.clone())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Namespaces>> {
        self.namespaces
            .read()
            .map_err(|e| SymError::Storage(format!("Lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Namespaces>> {
        self.namespaces
            .write()
            .map_err(|e| SymError::Storage(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait]
impl VectorBackend for VectorIndex {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        values: Vec<f32>,
        metadata: Metadata,
    ) -> Result<()> {
        if let Some(journal) = &self.journal {
            journal.upsert(namespace, id, &values, &metadata)?;
        }
        let mut guard = self.write()?;
        guard
            .entry(namespace.to_string())
            .or_default()
            .insert(id.to_string(), VectorEntry { values, metadata });
        Ok(())
    }

    async fn fetch_exists(&self, namespace: &str, id: &str) -> Result<bool> {
        Ok(self
            .read()?
            .get(namespace)
            .is_some_and(|ns| ns.contains_key(id)))
    }

    async fn update_metadata(&self, namespace: &str, id: &str, patch: Metadata) -> Result<()> {
        let mut guard = self.write()?;
        let entry = guard
            .get_mut(namespace)
            .and_then(|ns| ns.get_mut(id))
            .ok_or_else(|| SymError::NotFound(format!("vector entry {}", id)))?;
        let mut merged = entry.metadata.clone();
        for (key, value) in patch {
            merged.insert(key, value);
        }
        if let Some(journal) = &self.journal {
            journal.replace_metadata(namespace, id, &merged)?;
        }
        entry.metadata = merged;
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let guard = self.read()?;
        let Some(entries) = guard.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<SearchHit> = entries
            .iter()
            .map(|(id, entry)| SearchHit {
                id: id.clone(),
                score: cosine_similarity(vector, &entry.values),
                metadata: entry.metadata.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if the lengths differ or either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

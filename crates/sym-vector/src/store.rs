//! Vector store adapter bound to one namespace.
//!
//! Every mutating call checks that the namespace is present first and fails
//! with `SymError::Namespace` if it is not. Metadata updates additionally
//! require the entry to exist, so enrichment never creates entries.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use sym_core::bounded;
use sym_core::error::{Result, SymError};
use sym_core::types::Metadata;

use crate::index::{SearchHit, VectorBackend};

/// Typed operations over the feedback namespace of a vector backend.
#[derive(Clone)]
pub struct VectorStoreAdapter {
    backend: Arc<dyn VectorBackend>,
    namespace: String,
    timeout: Duration,
}

impl VectorStoreAdapter {
    pub fn new(backend: Arc<dyn VectorBackend>, namespace: impl Into<String>, timeout: Duration) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            timeout,
        }
    }

    /// True if `name` is present in the index.
    pub async fn namespace_exists(&self, name: &str) -> Result<bool> {
        let namespaces = bounded(
            "vector.describe_index_stats",
            self.timeout,
            self.backend.list_namespaces(),
        )
        .await?;
        Ok(namespaces.iter().any(|n| n == name))
    }

    async fn ensure_namespace(&self) -> Result<()> {
        if self.namespace_exists(&self.namespace).await? {
            Ok(())
        } else {
            warn!(namespace = %self.namespace, "Vector namespace missing");
            Err(SymError::Namespace(self.namespace.clone()))
        }
    }

    /// Insert or overwrite the entry for `id`.
    pub async fn upsert(&self, id: &str, values: Vec<f32>, metadata: Metadata) -> Result<()> {
        self.ensure_namespace().await?;
        bounded(
            "vector.upsert",
            self.timeout,
            self.backend.upsert(&self.namespace, id, values, metadata),
        )
        .await?;
        debug!(id, namespace = %self.namespace, "Vector upserted");
        Ok(())
    }

    /// Point-fetch existence check.
    pub async fn exists(&self, id: &str) -> Result<bool> {
        bounded(
            "vector.fetch",
            self.timeout,
            self.backend.fetch_exists(&self.namespace, id),
        )
        .await
    }

    /// Merge `patch` into an existing entry's metadata.
    ///
    /// Fails with `SymError::NotFound` when no entry has this id.
    pub async fn update_metadata_only(&self, id: &str, patch: Metadata) -> Result<()> {
        self.ensure_namespace().await?;
        if !self.exists(id).await? {
            return Err(SymError::NotFound(format!(
                "vector entry {} in namespace {}",
                id, self.namespace
            )));
        }
        bounded(
            "vector.update",
            self.timeout,
            self.backend.update_metadata(&self.namespace, id, patch),
        )
        .await?;
        debug!(id, namespace = %self.namespace, "Vector metadata updated");
        Ok(())
    }

    /// Nearest neighbours of `vector` within the namespace.
    pub async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        bounded(
            "vector.query",
            self.timeout,
            self.backend.query(&self.namespace, vector, top_k),
        )
        .await
    }
}

impl std::fmt::Debug for VectorStoreAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStoreAdapter")
            .field("namespace", &self.namespace)
            .field("timeout", &self.timeout)
            .finish()
    }
}

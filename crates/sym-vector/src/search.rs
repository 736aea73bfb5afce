//! Semantic search with a precision-first similarity filter.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use sym_core::bounded;
use sym_core::error::Result;
use sym_core::types::metadata_keys;

use crate::embedding::EmbeddingService;
use crate::index::SearchHit;
use crate::store::VectorStoreAdapter;

/// A retained search hit carrying the stored comment text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticHit {
    pub id: String,
    pub score: f64,
    pub content: String,
}

/// Keep hits scoring at least `threshold` (inclusive) whose metadata carries
/// a string `comentario` field. Order is preserved.
pub fn filter_hits(hits: Vec<SearchHit>, threshold: f64) -> Vec<SemanticHit> {
    hits.into_iter()
        .filter(|hit| hit.score >= threshold)
        .filter_map(|hit| {
            let content = hit.metadata.get(metadata_keys::COMMENT)?.as_str()?.to_string();
            Some(SemanticHit {
                id: hit.id,
                score: hit.score,
                content,
            })
        })
        .collect()
}

/// Embeds a free-text query and retrieves similar feedback.
pub struct SemanticSearch {
    store: VectorStoreAdapter,
    embedder: Arc<dyn EmbeddingService>,
    top_k: usize,
    threshold: f64,
    embed_timeout: Duration,
}

impl SemanticSearch {
    pub fn new(
        store: VectorStoreAdapter,
        embedder: Arc<dyn EmbeddingService>,
        top_k: usize,
        threshold: f64,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            store,
            embedder,
            top_k,
            threshold,
            embed_timeout,
        }
    }

    /// Top-k nearest entries for `query`, filtered by the similarity threshold.
    pub async fn search(&self, query: &str) -> Result<Vec<SemanticHit>> {
        let vector = bounded("embedding", self.embed_timeout, self.embedder.embed(query)).await?;
        let candidates = self.store.query(&vector, self.top_k).await?;
        let total = candidates.len();
        let kept = filter_hits(candidates, self.threshold);
        debug!(total, kept = kept.len(), threshold = self.threshold, "Semantic search complete");
        Ok(kept)
    }
}

//! Pinecone data-plane backend.
//!
//! Talks to an index host directly (`https://<index>-<project>.svc.<env>.pinecone.io`).
//! Namespaces are never created from here.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

use sym_core::config::VectorConfig;
use sym_core::error::{Result, SymError};
use sym_core::types::Metadata;

use crate::index::{SearchHit, VectorBackend};

const API_VERSION: &str = "2024-07";

/// HTTP client for one Pinecone index.
pub struct PineconeBackend {
    client: Client,
    host: String,
    api_key: String,
}

impl PineconeBackend {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Build from the `[vector]` section, reading the key from the environment.
    pub fn from_config(config: &VectorConfig) -> Result<Self> {
        if config.index_host.trim().is_empty() {
            return Err(SymError::Config(
                "vector.index_host is required for the pinecone backend".to_string(),
            ));
        }
        let api_key = sym_core::config::secret_from_env(&config.api_key_env)?;
        Ok(Self::new(&config.index_host, api_key))
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn send(&self, builder: RequestBuilder, operation: &str) -> Result<Response> {
        let response = self
            .request(builder)
            .send()
            .await
            .map_err(|e| SymError::Storage(format!("Pinecone {} failed: {}", operation, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SymError::Storage(format!(
                "Pinecone {} error ({}): {}",
                operation, status, body
            )));
        }
        Ok(response)
    }
}

impl std::fmt::Debug for PineconeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeBackend")
            .field("host", &self.host)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: Vec<f32>,
    metadata: Metadata,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f64,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[async_trait]
impl VectorBackend for PineconeBackend {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let response = self
            .send(
                self.client
                    .post(format!("{}/describe_index_stats", self.host))
                    .json(&json!({})),
                "describe_index_stats",
            )
            .await?;
        let stats: IndexStats = response
            .json()
            .await
            .map_err(|e| SymError::Storage(format!("Malformed index stats: {}", e)))?;
        Ok(stats.namespaces.into_keys().collect())
    }

    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        values: Vec<f32>,
        metadata: Metadata,
    ) -> Result<()> {
        let body = json!({
            "vectors": [UpsertVector { id, values, metadata }],
            "namespace": namespace,
        });
        self.send(
            self.client
                .post(format!("{}/vectors/upsert", self.host))
                .json(&body),
            "upsert",
        )
        .await?;
        debug!(id, namespace, "Pinecone upsert complete");
        Ok(())
    }

    async fn fetch_exists(&self, namespace: &str, id: &str) -> Result<bool> {
        let response = self
            .send(
                self.client
                    .get(format!("{}/vectors/fetch", self.host))
                    .query(&[("ids", id), ("namespace", namespace)]),
                "fetch",
            )
            .await?;
        let fetched: FetchResponse = response
            .json()
            .await
            .map_err(|e| SymError::Storage(format!("Malformed fetch response: {}", e)))?;
        Ok(fetched.vectors.contains_key(id))
    }

    async fn update_metadata(&self, namespace: &str, id: &str, patch: Metadata) -> Result<()> {
        let body = json!({
            "id": id,
            "setMetadata": patch,
            "namespace": namespace,
        });
        self.send(
            self.client
                .post(format!("{}/vectors/update", self.host))
                .json(&body),
            "update",
        )
        .await?;
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let body = json!({
            "namespace": namespace,
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });
        let response = self
            .send(
                self.client.post(format!("{}/query", self.host)).json(&body),
                "query",
            )
            .await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| SymError::Storage(format!("Malformed query response: {}", e)))?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| SearchHit {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }
}

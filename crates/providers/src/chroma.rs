//! Top-k retrieval from a Chroma collection over its REST API.

use anyhow::{Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use voxrag_core::Retriever;
use voxrag_types::{Passage, RetrievalResult};

const COLLECTIONS_PATH: &str = "/api/v1/collections";
/// Metadata field holding the passage text.
const TEXT_METADATA_KEY: &str = "text";

/// Turns text into the vector space of the collection.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone)]
pub struct ChromaConfig {
    pub host: String,
    pub port: u16,
    pub collection: String,
}

impl ChromaConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            collection: "qa-chatbot".to_string(),
        }
    }
}

#[derive(serde::Deserialize)]
struct CollectionResponse {
    id: String,
}

/// Column-oriented query result; the outer vectors have one row per query embedding.
#[derive(Debug, Default, serde::Deserialize)]
struct QueryResponse {
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

impl QueryResponse {
    /// Passages of the first query row, in rank order. Entries whose metadata
    /// carries no text are skipped.
    fn into_result(self) -> RetrievalResult {
        let metadatas = self
            .metadatas
            .and_then(|rows| rows.into_iter().next())
            .unwrap_or_default();
        let distances = self
            .distances
            .and_then(|rows| rows.into_iter().next())
            .unwrap_or_default();

        let passages = metadatas
            .into_iter()
            .enumerate()
            .filter_map(|(rank, metadata)| {
                let metadata = metadata?;
                let text = match metadata.get(TEXT_METADATA_KEY)? {
                    Value::String(text) if !text.is_empty() => text.clone(),
                    Value::String(_) | Value::Null => return None,
                    other => other.to_string(),
                };
                let passage = Passage::new(text).with_metadata(metadata);
                Some(match distances.get(rank).copied().flatten() {
                    Some(distance) => passage.with_distance(distance),
                    None => passage,
                })
            })
            .collect();
        RetrievalResult::from_passages(passages)
    }
}

pub struct ChromaRetriever {
    http: reqwest::Client,
    base_url: String,
    collection_id: String,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl ChromaRetriever {
    /// Resolves the collection, creating it with cosine distance if it does not exist.
    pub async fn connect(
        config: &ChromaConfig,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Result<Self> {
        let http = reqwest::Client::new();
        let base_url = config.base_url();
        let collection: CollectionResponse = http
            .post(format!("{base_url}{COLLECTIONS_PATH}"))
            .json(&json!({
                "name": config.collection,
                "metadata": { "hnsw:space": "cosine" },
                "get_or_create": true,
            }))
            .send()
            .await
            .with_context(|| format!("Chroma is not reachable at {base_url}"))?
            .error_for_status()
            .with_context(|| format!("Failed to open collection {}", config.collection))?
            .json()
            .await
            .context("Malformed collection response from Chroma")?;

        tracing::info!(
            "Using Chroma collection {} ({})",
            config.collection,
            collection.id
        );
        Ok(Self {
            http,
            base_url,
            collection_id: collection.id,
            embedder,
            top_k,
        })
    }
}

#[async_trait]
impl Retriever for ChromaRetriever {
    async fn query(&self, text: &str) -> Result<RetrievalResult> {
        let embedding = self
            .embedder
            .embed(text)
            .await
            .context("Failed to embed query")?;

        let response: QueryResponse = self
            .http
            .post(format!(
                "{}{}/{}/query",
                self.base_url, COLLECTIONS_PATH, self.collection_id
            ))
            .json(&json!({
                "query_embeddings": [embedding],
                "n_results": self.top_k,
                "include": ["metadatas", "documents", "distances"],
            }))
            .send()
            .await
            .context("Failed to query Chroma")?
            .error_for_status()
            .context("Chroma query failed")?
            .json()
            .await
            .context("Malformed query response from Chroma")?;

        let result = response.into_result();
        tracing::debug!(
            "Retrieved {} documents, first: {:?}",
            result.len(),
            result.first().metadata()
        );
        Ok(result)
    }
}

use crate::chroma::Embedder;
use anyhow::{Context, Result, anyhow, bail};
use async_stream::try_stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::sync::{Arc, Mutex};
use voxrag_core::{LanguageModel, TokenStream};
use voxrag_types::NdjsonDecoder;

mod config;
mod consts;
mod stats;

pub use config::{Config, ConfigBuilder, GenerateOptions};
pub use stats::Stats;

#[derive(serde::Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerateOptions,
}

/// One line of the `/api/generate` NDJSON stream.
#[derive(Debug, serde::Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    error: Option<String>,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

#[derive(serde::Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(serde::Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(serde::Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(serde::Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for a local Ollama runtime: streaming completion and embeddings.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: Config,
    stats: Arc<Mutex<Stats>>,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            stats: Arc::new(Mutex::new(Stats::new())),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Confirms the runtime answers before the service starts taking requests.
    pub async fn health_check(&self) -> Result<()> {
        let url = self.config.url(consts::TAGS_PATH);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Ollama is not reachable at {}", self.config.base_url()))?
            .error_for_status()
            .context("Ollama health check failed")?;
        let tags: TagsResponse = response
            .json()
            .await
            .context("Unexpected response from Ollama tags endpoint")?;

        let names: Vec<&str> = tags.models.iter().map(|m| m.name.as_str()).collect();
        tracing::info!("Connected to Ollama, available models: {:?}", names);
        if !names.contains(&self.config.model()) {
            tracing::warn!(
                "Model {} is not pulled on this Ollama instance",
                self.config.model()
            );
        }
        Ok(())
    }

    // Return a copy of the usage counters.
    pub fn stats(&self) -> Result<Stats> {
        if let Ok(stats_guard) = self.stats.lock() {
            Ok(stats_guard.clone())
        } else {
            Err(anyhow!("failed to get stats"))
        }
    }
}

#[async_trait]
impl LanguageModel for Client {
    async fn stream(&self, prompt: &str) -> Result<TokenStream> {
        let request = GenerateRequest {
            model: self.config.model(),
            prompt,
            stream: true,
            options: self.config.options(),
        };
        let response = self
            .http
            .post(self.config.url(consts::GENERATE_PATH))
            .json(&request)
            .send()
            .await
            .context("Failed to reach Ollama")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Ollama returned {}: {}", status, body);
        }

        Ok(Box::pin(fragments(response.bytes_stream(), self.stats.clone())))
    }
}

#[async_trait]
impl Embedder for Client {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.config.embed_model(),
            prompt: text,
        };
        let response: EmbeddingResponse = self
            .http
            .post(self.config.url(consts::EMBEDDINGS_PATH))
            .json(&request)
            .send()
            .await
            .context("Failed to reach Ollama for embeddings")?
            .error_for_status()
            .context("Ollama embeddings request failed")?
            .json()
            .await
            .context("Malformed embeddings response")?;

        if response.embedding.is_empty() {
            bail!("Ollama returned an empty embedding for model {}", self.config.embed_model());
        }
        Ok(response.embedding)
    }
}

/// Decodes the NDJSON body into answer fragments.
fn fragments(
    body: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    stats: Arc<Mutex<Stats>>,
) -> impl Stream<Item = Result<String>> + Send {
    try_stream! {
        let mut body = Box::pin(body);
        let mut decoder = NdjsonDecoder::new();
        while let Some(bytes) = body.next().await {
            let bytes = bytes.context("Ollama stream interrupted")?;
            for chunk in decoder.push::<GenerateChunk>(&bytes)? {
                if let Some(fragment) = accept_chunk(chunk, &stats)? {
                    yield fragment;
                }
            }
        }
        if let Some(chunk) = decoder.finish::<GenerateChunk>()? {
            if let Some(fragment) = accept_chunk(chunk, &stats)? {
                yield fragment;
            }
        }
    }
}

/// Extracts the text of one stream line, turning in-band errors into `Err` and
/// recording usage from the closing line.
fn accept_chunk(chunk: GenerateChunk, stats: &Mutex<Stats>) -> Result<Option<String>> {
    if let Some(error) = chunk.error {
        bail!("Ollama generation error: {}", error);
    }

    if chunk.done {
        let input = chunk.prompt_eval_count.unwrap_or(0);
        let output = chunk.eval_count.unwrap_or(0);
        if let Ok(mut stats_guard) = stats.lock() {
            stats_guard.update_usage(input, output);
        } else {
            tracing::error!("failed to update stats");
        }
        tracing::debug!("input_tokens: {}, output_tokens: {}", input, output);
    }

    if chunk.response.is_empty() {
        Ok(None)
    } else {
        Ok(Some(chunk.response))
    }
}

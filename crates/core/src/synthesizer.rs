use crate::error::SynthesisError;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use std::time::Duration;
use voxrag_types::{AudioSegment, TextChunk};

/// A text-to-speech provider returning one encoded clip per call.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Bytes>;
}

/// Turns a [`TextChunk`] into its [`AudioSegment`], bounding each call by an
/// optional timeout.
#[derive(Clone)]
pub struct SynthesisStage {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    timeout: Option<Duration>,
}

impl SynthesisStage {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, timeout: Option<Duration>) -> Self {
        Self {
            synthesizer,
            timeout,
        }
    }

    pub async fn synthesize(&self, chunk: &TextChunk) -> Result<AudioSegment, SynthesisError> {
        let index = chunk.index();
        tracing::debug!("Synthesizing chunk {}: {:?}", index, chunk.text());

        let call = self.synthesizer.synthesize(chunk.text());
        let outcome = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| SynthesisError::Timeout { index, timeout })?,
            None => call.await,
        };

        let payload = outcome
            .and_then(|payload| {
                if payload.is_empty() {
                    Err(anyhow!("provider returned an empty clip"))
                } else {
                    Ok(payload)
                }
            })
            .map_err(|reason| SynthesisError::Provider { index, reason })?;

        tracing::debug!("Chunk {} synthesized, {} bytes of audio", index, payload.len());
        Ok(AudioSegment::for_chunk(chunk, payload))
    }
}

//! One question in, one ordered stream of text and audio records out.
//!
//! The run is strictly sequential: the next token is not pulled until the
//! previous fragment is written and, when a chunk boundary fires, its speech has
//! been synthesized (or dropped) and written. Wire order therefore equals
//! production order and no reorder buffer is needed.

use crate::config::PipelineConfig;
use crate::context::ContextFormatter;
use crate::error::PipelineError;
use crate::multiplexer::StreamMultiplexer;
use crate::qa::AnswerBackend;
use crate::retriever::Retriever;
use crate::session::GenerationSession;
use crate::synthesizer::{SpeechSynthesizer, SynthesisStage};
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use voxrag_types::{ChatRequest, TextChunk, WireEvent};

#[derive(Clone)]
pub struct ResponsePipeline {
    retriever: Arc<dyn Retriever>,
    formatter: ContextFormatter,
    backend: AnswerBackend,
    synthesis: Option<SynthesisStage>,
    config: PipelineConfig,
}

impl ResponsePipeline {
    /// `synthesizer` is `None` when no speech provider is configured; voice
    /// requests are then answered with text only.
    pub fn new(
        retriever: Arc<dyn Retriever>,
        backend: AnswerBackend,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            retriever,
            formatter: ContextFormatter::new(config.context_strategy),
            backend,
            synthesis: synthesizer.map(|s| SynthesisStage::new(s, config.synthesis_timeout)),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn backend(&self) -> &AnswerBackend {
        &self.backend
    }

    /// Starts the request on its own task and returns the record stream. Dropping
    /// the receiver cancels the run.
    pub fn spawn(&self, request: ChatRequest) -> mpsc::Receiver<WireEvent> {
        let (mut mux, rx) = StreamMultiplexer::channel(self.config.channel_capacity);
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run(request, &mut mux).await });
        rx
    }

    /// Drives one request to completion. Failures never escape: a broken request
    /// ends with the generic failure record, a disconnect ends silently.
    pub async fn run(&self, request: ChatRequest, mux: &mut StreamMultiplexer) {
        tracing::info!(
            "Processing question (voice: {}): {}",
            request.voice_enabled,
            request.message
        );

        match self.respond(&request, mux).await {
            Ok(()) => {
                let (text, audio) = mux.counts();
                tracing::info!("Response complete: {} text and {} audio records", text, audio);
            }
            Err(PipelineError::Disconnected) => {
                tracing::info!("Client disconnected, abandoning response");
            }
            Err(err) => {
                tracing::error!("Request failed: {}", err);
                if mux.fail().await.is_err() {
                    tracing::debug!("Client gone before the failure record was written");
                }
            }
        }
    }

    async fn respond(
        &self,
        request: &ChatRequest,
        mux: &mut StreamMultiplexer,
    ) -> Result<(), PipelineError> {
        let question = request.message.trim();

        let retrieved = until_closed(mux, self.retriever.query(question))
            .await?
            .map_err(PipelineError::Retrieval)?;
        tracing::debug!("Retrieved {} passages", retrieved.len());
        let context = self.formatter.format(&retrieved);

        let mut tokens = until_closed(mux, self.backend.answer(&context, question))
            .await?
            .map_err(PipelineError::Generation)?;

        let voice = request.voice_enabled && self.synthesis.is_some();
        let mut session = GenerationSession::new(voice, &self.config);

        while let Some(fragment) = until_closed(mux, tokens.next()).await? {
            let fragment = fragment.map_err(PipelineError::Generation)?;
            if fragment.is_empty() {
                continue;
            }
            mux.send_text(&fragment).await?;
            if let Some(chunk) = session.push(&fragment) {
                self.speak(&chunk, mux).await?;
            }
        }

        tracing::debug!(
            "Answer finished, {} chars in {} chunks before the final one",
            session.answer_chars(),
            session.chunks_emitted()
        );
        if let Some(chunk) = session.finish() {
            self.speak(&chunk, mux).await?;
        }
        Ok(())
    }

    /// Synthesizes one chunk after its pacing delay. A synthesis failure only
    /// drops this chunk's audio.
    async fn speak(
        &self,
        chunk: &TextChunk,
        mux: &mut StreamMultiplexer,
    ) -> Result<(), PipelineError> {
        let Some(stage) = &self.synthesis else {
            return Ok(());
        };

        let delay = self.config.pacing.delay_for(chunk);
        if !delay.is_zero() {
            until_closed(mux, tokio::time::sleep(delay)).await?;
        }

        match until_closed(mux, stage.synthesize(chunk)).await? {
            Ok(segment) => mux.send_audio(&segment).await,
            Err(err) => {
                tracing::warn!("{}; continuing without audio for this chunk", err);
                Ok(())
            }
        }
    }
}

/// Awaits `work` unless the client goes away first; in-flight work is dropped.
async fn until_closed<F: Future>(
    mux: &StreamMultiplexer,
    work: F,
) -> Result<F::Output, PipelineError> {
    tokio::select! {
        biased;
        _ = mux.closed() => Err(PipelineError::Disconnected),
        output = work => Ok(output),
    }
}

use crate::error::{GENERIC_FAILURE_MESSAGE, PipelineError};
use tokio::sync::mpsc;
use voxrag_types::{AudioSegment, WireEvent};

/// Single writer of the response channel.
///
/// Events are forwarded in call order and nothing is reordered; the pipeline
/// calls it in the order records must appear on the wire. The channel is
/// bounded, so a slow reader suspends the pipeline on the next send.
#[derive(Debug)]
pub struct StreamMultiplexer {
    tx: mpsc::Sender<WireEvent>,
    text_events: usize,
    audio_events: usize,
}

impl StreamMultiplexer {
    pub fn new(tx: mpsc::Sender<WireEvent>) -> Self {
        Self {
            tx,
            text_events: 0,
            audio_events: 0,
        }
    }

    /// Creates a multiplexer and the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<WireEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub async fn send_text(&mut self, content: &str) -> Result<(), PipelineError> {
        self.send(WireEvent::text(content)).await?;
        self.text_events += 1;
        Ok(())
    }

    pub async fn send_audio(&mut self, segment: &AudioSegment) -> Result<(), PipelineError> {
        self.send(WireEvent::audio(segment)).await?;
        self.audio_events += 1;
        Ok(())
    }

    /// Writes the single failure record that ends a broken request.
    pub async fn fail(&mut self) -> Result<(), PipelineError> {
        self.send_text(GENERIC_FAILURE_MESSAGE).await
    }

    /// Resolves once the reading side has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// `(text, audio)` records written so far.
    pub fn counts(&self) -> (usize, usize) {
        (self.text_events, self.audio_events)
    }

    async fn send(&self, event: WireEvent) -> Result<(), PipelineError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| PipelineError::Disconnected)
    }
}

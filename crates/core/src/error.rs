use std::time::Duration;

/// Message written to the text channel when a request fails as a whole.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while processing your request.";

/// Failures that end a request.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("retrieval failed: {0:#}")]
    Retrieval(anyhow::Error),
    #[error("answer generation failed: {0:#}")]
    Generation(anyhow::Error),
    /// The response channel closed; the client has gone away.
    #[error("client disconnected")]
    Disconnected,
}

/// A failed speech call. Only that chunk's audio is lost.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("speech synthesis for chunk {index} timed out after {timeout:?}")]
    Timeout { index: usize, timeout: Duration },
    #[error("speech synthesis for chunk {index} failed: {reason:#}")]
    Provider { index: usize, reason: anyhow::Error },
}

impl SynthesisError {
    pub fn index(&self) -> usize {
        match self {
            Self::Timeout { index, .. } | Self::Provider { index, .. } => *index,
        }
    }
}

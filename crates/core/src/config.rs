//! Tunables for one answer pipeline.
//!
//! The pipeline never reads the environment itself; the service builds a
//! [`PipelineConfig`] at startup and hands it to the constructor.

use std::str::FromStr;
use std::time::Duration;
use voxrag_types::TextChunk;

/// How a ranked retrieval result is flattened into prompt context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextStrategy {
    /// Use only the best-ranked passage.
    #[default]
    FirstPassage,
    /// Join every returned passage with a blank line.
    AllPassages,
}

impl FromStr for ContextStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(Self::FirstPassage),
            "all" => Ok(Self::AllPassages),
            other => Err(format!("'{other}' is not one of: first, all")),
        }
    }
}

/// Pauses applied before each synthesis call to keep the speech provider from
/// being flooded and to smooth playback pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub first_chunk: Duration,
    pub inter_chunk: Duration,
    pub final_chunk: Duration,
}

impl PacingConfig {
    /// No pauses at all.
    pub fn none() -> Self {
        Self {
            first_chunk: Duration::ZERO,
            inter_chunk: Duration::ZERO,
            final_chunk: Duration::ZERO,
        }
    }

    /// Pause to observe before synthesizing `chunk`. A final chunk always gets
    /// the final pause, even when it is also the first.
    pub fn delay_for(&self, chunk: &TextChunk) -> Duration {
        if chunk.is_final() {
            self.final_chunk
        } else if chunk.index() == 0 {
            self.first_chunk
        } else {
            self.inter_chunk
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            first_chunk: Duration::from_millis(300),
            inter_chunk: Duration::from_millis(200),
            final_chunk: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Characters buffered before the first chunk is spoken.
    pub first_chunk_min_chars: usize,
    /// Shortest sentence-terminated chunk after the first one.
    pub sentence_min_chars: usize,
    /// Forced cut for run-on text without terminal punctuation.
    pub max_chunk_chars: usize,
    pub pacing: PacingConfig,
    /// Passages requested from the retriever.
    pub top_k: usize,
    /// Global switch; a request asking for voice gets none when this is off.
    pub synthesis_enabled: bool,
    /// Upper bound on a single synthesis call; expiry drops that chunk's audio.
    pub synthesis_timeout: Option<Duration>,
    pub context_strategy: ContextStrategy,
    /// Extractive answers scoring below this fall back to generation.
    pub qa_fallback_threshold: f32,
    /// Records buffered between the pipeline and the response body.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            first_chunk_min_chars: 50,
            sentence_min_chars: 30,
            max_chunk_chars: 100,
            pacing: PacingConfig::default(),
            top_k: 3,
            synthesis_enabled: true,
            synthesis_timeout: Some(Duration::from_secs(15)),
            context_strategy: ContextStrategy::default(),
            qa_fallback_threshold: 0.1,
            channel_capacity: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_strategy_parsing() {
        assert_eq!("first".parse(), Ok(ContextStrategy::FirstPassage));
        assert_eq!("ALL".parse(), Ok(ContextStrategy::AllPassages));
        assert!("some".parse::<ContextStrategy>().is_err());
    }

    #[test]
    fn test_defaults_match_reference_thresholds() {
        let config = PipelineConfig::default();
        assert_eq!(config.first_chunk_min_chars, 50);
        assert_eq!(config.sentence_min_chars, 30);
        assert_eq!(config.max_chunk_chars, 100);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.pacing.first_chunk, Duration::from_millis(300));
        assert_eq!(config.pacing.inter_chunk, Duration::from_millis(200));
        assert_eq!(config.pacing.final_chunk, Duration::from_millis(100));
    }

    #[test]
    fn test_pacing_follows_chunk_position() {
        use voxrag_types::BoundaryReason;

        let pacing = PacingConfig::default();
        let first = TextChunk::new("a", 0, BoundaryReason::MaxLength);
        let middle = TextChunk::new("b", 3, BoundaryReason::Sentence);
        let only = TextChunk::new("c", 0, BoundaryReason::Final);

        assert_eq!(pacing.delay_for(&first), Duration::from_millis(300));
        assert_eq!(pacing.delay_for(&middle), Duration::from_millis(200));
        assert_eq!(pacing.delay_for(&only), Duration::from_millis(100));
    }
}

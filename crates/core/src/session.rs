use crate::config::PipelineConfig;
use crate::segmenter::{ChunkThresholds, TextSegmenter};
use voxrag_types::TextChunk;

/// Per-request generation state, owned by exactly one pipeline run.
///
/// Holds the segmenter only when speech was both requested and enabled; a
/// text-only session never produces chunks.
#[derive(Debug)]
pub struct GenerationSession {
    segmenter: Option<TextSegmenter>,
    answer_chars: usize,
    chunks_emitted: usize,
}

impl GenerationSession {
    pub fn new(voice_requested: bool, config: &PipelineConfig) -> Self {
        let voice_enabled = voice_requested && config.synthesis_enabled;
        if voice_requested && !config.synthesis_enabled {
            tracing::debug!("Voice requested but speech synthesis is disabled");
        }
        Self {
            segmenter: voice_enabled.then(|| TextSegmenter::new(ChunkThresholds::from(config))),
            answer_chars: 0,
            chunks_emitted: 0,
        }
    }

    pub fn voice_enabled(&self) -> bool {
        self.segmenter.is_some()
    }

    /// Records a fragment and returns the chunk to speak, if a boundary fired.
    pub fn push(&mut self, fragment: &str) -> Option<TextChunk> {
        self.answer_chars += fragment.chars().count();
        let chunk = self.segmenter.as_mut()?.push(fragment)?;
        self.chunks_emitted += 1;
        Some(chunk)
    }

    /// Closes the session, returning the final chunk if text is still buffered.
    pub fn finish(self) -> Option<TextChunk> {
        self.segmenter.and_then(TextSegmenter::finish)
    }

    /// Characters of answer text seen so far.
    pub fn answer_chars(&self) -> usize {
        self.answer_chars
    }

    /// Chunks cut so far, excluding the final one.
    pub fn chunks_emitted(&self) -> usize {
        self.chunks_emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_only_session_never_chunks() {
        let mut session = GenerationSession::new(false, &PipelineConfig::default());
        assert!(!session.voice_enabled());
        assert_eq!(session.push(&"x".repeat(200)), None);
        assert_eq!(session.answer_chars(), 200);
        assert_eq!(session.finish(), None);
    }

    #[test]
    fn test_global_switch_overrides_request() {
        let config = PipelineConfig {
            synthesis_enabled: false,
            ..PipelineConfig::default()
        };
        assert!(!GenerationSession::new(true, &config).voice_enabled());
    }

    #[test]
    fn test_voice_session_counts_whole_answer() {
        let mut session = GenerationSession::new(true, &PipelineConfig::default());
        assert!(session.push(&"A".repeat(50)).is_some());
        assert_eq!(session.push(" and the rest"), None);
        assert_eq!(session.chunks_emitted(), 1);
        assert_eq!(session.push("\u{e9}"), None);
        assert_eq!(session.answer_chars(), 64);

        assert_eq!(session.finish().unwrap().text(), "and the rest\u{e9}");
    }
}

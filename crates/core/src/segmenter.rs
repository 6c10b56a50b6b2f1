//! Decides where the answer text is cut into chunks for speech.
//!
//! The first chunk uses a lower threshold to shorten time-to-first-audio. Later
//! chunks prefer sentence ends for natural prosody, with a hard length cap so a
//! run-on sentence cannot stall audio. Lengths are counted in `char`s.

use crate::config::PipelineConfig;
use voxrag_types::{BoundaryReason, TextChunk};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    AwaitingFirstChunk,
    AwaitingSentenceChunk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkThresholds {
    pub first_chunk_min_chars: usize,
    pub sentence_min_chars: usize,
    pub max_chunk_chars: usize,
}

impl From<&PipelineConfig> for ChunkThresholds {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            first_chunk_min_chars: config.first_chunk_min_chars,
            sentence_min_chars: config.sentence_min_chars,
            max_chunk_chars: config.max_chunk_chars,
        }
    }
}

impl Default for ChunkThresholds {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

#[derive(Debug)]
pub struct TextSegmenter {
    thresholds: ChunkThresholds,
    state: SegmenterState,
    buffer: String,
    next_index: usize,
}

impl TextSegmenter {
    pub fn new(thresholds: ChunkThresholds) -> Self {
        Self {
            thresholds,
            state: SegmenterState::AwaitingFirstChunk,
            buffer: String::new(),
            next_index: 0,
        }
    }

    pub fn state(&self) -> SegmenterState {
        self.state
    }

    /// Text appended since the last cut.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Appends a fragment and returns a chunk if a boundary fired. At most one
    /// chunk is produced per fragment.
    pub fn push(&mut self, fragment: &str) -> Option<TextChunk> {
        self.buffer.push_str(fragment);
        let len = self.buffer.chars().count();
        let sentence_end = ends_sentence(&self.buffer);

        match self.state {
            SegmenterState::AwaitingFirstChunk if len >= self.thresholds.first_chunk_min_chars => {
                self.state = SegmenterState::AwaitingSentenceChunk;
                let reason = if sentence_end {
                    BoundaryReason::Sentence
                } else {
                    BoundaryReason::MaxLength
                };
                Some(self.cut(reason))
            }
            SegmenterState::AwaitingSentenceChunk
                if sentence_end && len >= self.thresholds.sentence_min_chars =>
            {
                Some(self.cut(BoundaryReason::Sentence))
            }
            SegmenterState::AwaitingSentenceChunk if len >= self.thresholds.max_chunk_chars => {
                Some(self.cut(BoundaryReason::MaxLength))
            }
            _ => None,
        }
    }

    /// Ends segmentation: whatever is buffered, trimmed, becomes the final chunk.
    pub fn finish(mut self) -> Option<TextChunk> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = rest.trim();
        if rest.is_empty() {
            return None;
        }
        Some(TextChunk::new(rest, self.next_index, BoundaryReason::Final))
    }

    fn cut(&mut self, reason: BoundaryReason) -> TextChunk {
        let text = std::mem::take(&mut self.buffer);
        let chunk = TextChunk::new(text, self.next_index, reason);
        self.next_index += 1;
        chunk
    }
}

/// Terminal `.`, `!` or `?`, optionally followed by whitespace.
fn ends_sentence(text: &str) -> bool {
    matches!(text.trim_end().chars().last(), Some('.' | '!' | '?'))
}

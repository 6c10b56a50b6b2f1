use bytes::Bytes;

/// Why the segmenter cut the buffer where it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoundaryReason {
    /// The buffer ended on terminal punctuation.
    Sentence,
    /// The buffer reached its length limit without a sentence end.
    MaxLength,
    /// The token stream ended with text still buffered.
    Final,
}

/// A span of answer text handed to speech synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    text: String,
    index: usize,
    reason: BoundaryReason,
}

impl TextChunk {
    pub fn new(text: impl Into<String>, index: usize, reason: BoundaryReason) -> Self {
        Self {
            text: text.into(),
            index,
            reason,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn reason(&self) -> BoundaryReason {
        self.reason
    }

    pub fn is_final(&self) -> bool {
        self.reason == BoundaryReason::Final
    }
}

/// Synthesized speech for one [`TextChunk`]; `index` matches the chunk it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSegment {
    index: usize,
    payload: Bytes,
    is_final: bool,
}

impl AudioSegment {
    pub fn new(index: usize, payload: Bytes, is_final: bool) -> Self {
        Self {
            index,
            payload,
            is_final,
        }
    }

    /// Builds the segment for `chunk`, inheriting its index and finality.
    pub fn for_chunk(chunk: &TextChunk, payload: Bytes) -> Self {
        Self::new(chunk.index(), payload, chunk.is_final())
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }
}

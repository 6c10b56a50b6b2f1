use crate::audio::{self, Base64EncodedAudioBytes};
use crate::chunk::AudioSegment;

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub voice_enabled: bool,
}

impl ChatRequest {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            voice_enabled: false,
        }
    }

    pub fn with_voice(mut self, enabled: bool) -> Self {
        self.voice_enabled = enabled;
        self
    }
}

/// One record of the server to client stream, written as a single JSON line.
///
/// Records carry no sequence number; the order on the wire is the only ordering
/// the client sees, so producers must emit them already in final order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum WireEvent {
    #[serde(rename = "text")]
    Text { content: String },
    #[serde(rename = "audio")]
    Audio {
        content: Base64EncodedAudioBytes,
        #[serde(rename = "isFinal", default)]
        is_final: bool,
    },
}

impl WireEvent {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn audio(segment: &AudioSegment) -> Self {
        Self::Audio {
            content: audio::encode(segment.payload()),
            is_final: segment.is_final(),
        }
    }

    /// Serializes the record followed by the `\n` delimiter.
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

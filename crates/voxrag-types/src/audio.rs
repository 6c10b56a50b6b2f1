use base64::Engine;

/// Audio data encoded as base64
pub type Base64EncodedAudioBytes = String;

/// Encodes an audio clip for transport inside a JSON record.
pub fn encode(payload: &[u8]) -> Base64EncodedAudioBytes {
    base64::engine::general_purpose::STANDARD.encode(payload)
}

/// Decodes a base64 audio record back into the raw clip bytes.
pub fn decode(content: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(content)
}

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use secrecy::{ExposeSecret, SecretString};
use voxrag_core::SpeechSynthesizer;

pub const BASE_URL: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_MODEL: &str = "eleven_multilingual_v1";
const API_KEY_HEADER: &str = "xi-api-key";
const AUDIO_MPEG: &str = "audio/mpeg";

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VoiceSettings {
    pub stability: f64,
    pub similarity_boost: f64,
    pub style: f64,
    pub speaking_rate: f64,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.6,
            style: 0.35,
            speaking_rate: 1.1,
            use_speaker_boost: true,
        }
    }
}

#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

#[derive(Clone)]
pub struct Config {
    pub api_key: SecretString,
    pub voice_id: String,
    pub model_id: String,
    pub base_url: String,
    pub voice_settings: VoiceSettings,
}

impl Config {
    pub fn new(api_key: SecretString, voice_id: &str) -> Self {
        Self {
            api_key,
            voice_id: voice_id.to_string(),
            model_id: DEFAULT_MODEL.to_string(),
            base_url: BASE_URL.to_string(),
            voice_settings: VoiceSettings::default(),
        }
    }

    fn stream_url(&self) -> String {
        format!("{}/text-to-speech/{}/stream", self.base_url, self.voice_id)
    }
}

/// ElevenLabs text-to-speech; each call returns one complete MP3 clip.
pub struct Client {
    http: reqwest::Client,
    config: Config,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for Client {
    async fn synthesize(&self, text: &str) -> Result<Bytes> {
        let request = SpeechRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: &self.config.voice_settings,
        };
        let response = self
            .http
            .post(self.config.stream_url())
            .header(reqwest::header::ACCEPT, AUDIO_MPEG)
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .context("Failed to reach ElevenLabs")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("ElevenLabs returned {}: {}", status, body);
        }

        let audio = response
            .bytes()
            .await
            .context("ElevenLabs audio stream interrupted")?;
        tracing::debug!("Received {} bytes of audio for {:?}", audio.len(), text);
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_carries_voice_settings() {
        let settings = VoiceSettings::default();
        let request = SpeechRequest {
            text: "Hello.",
            model_id: DEFAULT_MODEL,
            voice_settings: &settings,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "text": "Hello.",
                "model_id": "eleven_multilingual_v1",
                "voice_settings": {
                    "stability": 0.5,
                    "similarity_boost": 0.6,
                    "style": 0.35,
                    "speaking_rate": 1.1,
                    "use_speaker_boost": true
                }
            })
        );
    }

    #[test]
    fn test_stream_url_includes_voice() {
        let config = Config::new(SecretString::from("key"), "21m00Tcm4TlvDq8ikWAM");
        assert_eq!(
            config.stream_url(),
            "https://api.elevenlabs.io/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM/stream"
        );
    }
}

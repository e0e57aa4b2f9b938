//! ElevenLabs text-to-speech client.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::error::GenerateError;

/// Default API endpoint.
pub const API_BASE: &str = "https://api.elevenlabs.io";

/// Renders text into an encoded audio clip.
#[async_trait]
pub trait ClipSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Bytes, GenerateError>;
}

/// Voice tuning sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    /// Consistent but still expressive, close to the source voice.
    fn default() -> Self {
        Self {
            stability: 0.55,
            similarity_boost: 0.75,
            style: 0.35,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// Client for `POST /v1/text-to-speech/{voice}`.
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    voice_id: String,
    model_id: String,
    settings: VoiceSettings,
}

impl ElevenLabsClient {
    pub fn new(
        api_key: impl Into<String>,
        voice_id: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: API_BASE.to_string(),
            api_key: api_key.into(),
            voice_id: voice_id.into(),
            model_id: model_id.into(),
            settings: VoiceSettings::default(),
        }
    }

    /// Point the client at another server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.base_url.trim_end_matches('/'),
            self.voice_id
        )
    }

    fn body<'a>(&'a self, text: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            text,
            model_id: &self.model_id,
            voice_settings: self.settings,
        }
    }
}

#[async_trait]
impl ClipSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Bytes, GenerateError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&self.body(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_includes_voice() {
        let client = ElevenLabsClient::new("sk", "voice123", "eleven_multilingual_v2")
            .with_base_url("http://localhost:9000/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9000/v1/text-to-speech/voice123"
        );
    }

    #[test]
    fn request_body_carries_model_and_settings() {
        let client = ElevenLabsClient::new("sk", "voice123", "eleven_multilingual_v2");
        let body = serde_json::to_value(client.body("¡Muy bien!")).unwrap();

        assert_eq!(body["text"], "¡Muy bien!");
        assert_eq!(body["model_id"], "eleven_multilingual_v2");
        assert_eq!(body["voice_settings"]["use_speaker_boost"], true);
        let stability = body["voice_settings"]["stability"].as_f64().unwrap();
        assert!((stability - 0.55).abs() < 1e-6);
        let style = body["voice_settings"]["style"].as_f64().unwrap();
        assert!((style - 0.35).abs() < 1e-6);
    }
}

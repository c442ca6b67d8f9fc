//! Text-to-speech (TTS) processing

use secrecy::{ExposeSecret, SecretString};

use crate::config::{MAX_TTS_SPEED, MIN_TTS_SPEED};
use crate::{Error, Result};

/// Synthesizes speech from text via an OpenAI-compatible `/audio/speech` endpoint
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    speed: f64,
}

impl TextToSpeech {
    /// Create a new TTS instance
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: SecretString, base_url: &str, model: String, speed: f64) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            speed: speed.clamp(MIN_TTS_SPEED, MAX_TTS_SPEED),
        })
    }

    /// Synthesize text to speech
    ///
    /// # Arguments
    ///
    /// * `text` - Text to synthesize
    /// * `voice` - Voice identifier (e.g. "alloy")
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed: self.speed,
        };

        tracing::debug!(model = %self.model, voice, chars = text.len(), "synthesizing speech");

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(Error::Tts("TTS returned no audio".to_string()));
        }
        Ok(audio.to_vec())
    }
}

#[derive(serde::Serialize)]
struct TtsRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        let result = TextToSpeech::new(
            SecretString::from(String::new()),
            "https://api.openai.com/v1",
            "tts-1".to_string(),
            1.0,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn speed_is_clamped() {
        let tts = TextToSpeech::new(
            SecretString::from("sk-test".to_string()),
            "https://api.openai.com/v1/",
            "tts-1".to_string(),
            0.1,
        )
        .unwrap();
        assert!((tts.speed - MIN_TTS_SPEED).abs() < f64::EPSILON);
        assert_eq!(tts.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn request_shape() {
        let json = serde_json::to_value(TtsRequest {
            model: "tts-1",
            input: "Hello!",
            voice: "nova",
            speed: 1.0,
        })
        .unwrap();
        assert_eq!(json["input"], "Hello!");
        assert_eq!(json["voice"], "nova");
        assert_eq!(json["model"], "tts-1");
    }
}

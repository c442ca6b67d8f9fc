//! Speech output
//!
//! Replies are spoken through a [`SpeechSynthesizer`]. Speaking is fire-and-forget
//! from the conversation's point of view: [`speak_detached`] spawns the work and only
//! logs failures.

#[cfg(feature = "audio")]
mod playback;
mod tts;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

#[cfg(feature = "audio")]
pub use playback::AudioPlayback;
pub use tts::TextToSpeech;

use crate::Result;

/// Something that can say text out loud in a given voice
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` using `voice_id`
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or audio output fails
    async fn speak(&self, text: &str, voice_id: &str) -> Result<()>;
}

/// Where synthesized audio ends up
#[derive(Debug, Clone)]
pub enum AudioSink {
    /// Default output device
    #[cfg(feature = "audio")]
    Speakers,
    /// MP3 file, overwritten on every utterance
    File(PathBuf),
}

impl AudioSink {
    /// Speakers when audio support is compiled in and enabled, else a file in the cache dir
    #[cfg(feature = "audio")]
    #[must_use]
    pub fn preferred(audio_enabled: bool) -> Self {
        if audio_enabled {
            Self::Speakers
        } else {
            Self::cache_file()
        }
    }

    /// Speakers when audio support is compiled in and enabled, else a file in the cache dir
    #[cfg(not(feature = "audio"))]
    #[must_use]
    pub fn preferred(audio_enabled: bool) -> Self {
        if audio_enabled {
            tracing::debug!("built without the `audio` feature, writing speech to file");
        }
        Self::cache_file()
    }

    fn cache_file() -> Self {
        Self::File(crate::config::cache_dir().join("last_reply.mp3"))
    }
}

/// Speech via an OpenAI-compatible TTS endpoint
pub struct OpenAiSpeech {
    tts: TextToSpeech,
    sink: AudioSink,
}

impl OpenAiSpeech {
    #[must_use]
    pub const fn new(tts: TextToSpeech, sink: AudioSink) -> Self {
        Self { tts, sink }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn speak(&self, text: &str, voice_id: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let audio = self.tts.synthesize(text, voice_id).await?;

        match &self.sink {
            #[cfg(feature = "audio")]
            AudioSink::Speakers => {
                tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3(&audio))
                    .await
                    .map_err(|e| crate::Error::Audio(format!("playback task failed: {e}")))??;
            }
            AudioSink::File(path) => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(path, &audio).await?;
                tracing::info!(path = %path.display(), bytes = audio.len(), "speech saved");
            }
        }

        Ok(())
    }
}

/// Speak without waiting; failures are logged and otherwise ignored
pub fn speak_detached(
    synth: Arc<dyn SpeechSynthesizer>,
    text: String,
    voice_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = synth.speak(&text, &voice_id).await {
            tracing::warn!(error = %e, voice = %voice_id, "speech failed");
        }
    })
}

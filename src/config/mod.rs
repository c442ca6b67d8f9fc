//! Configuration management for Banter
//!
//! Sources, later wins: built-in defaults, `config.toml`, environment, then CLI flags
//! (applied by the binary). User preferences (voice, credential) are not configuration;
//! see [`crate::preferences`].

pub mod file;

use std::path::PathBuf;

use crate::completion::{DEFAULT_API_BASE_URL, DEFAULT_MODEL};
use crate::controller::DEFAULT_SYSTEM_PROMPT;
use crate::{Error, Result};

/// Lowest speed the TTS endpoint accepts
pub const MIN_TTS_SPEED: f64 = 0.25;

/// Highest speed the TTS endpoint accepts
pub const MAX_TTS_SPEED: f64 = 4.0;

/// Banter configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat model identifier
    pub model: String,

    /// OpenAI-compatible API base URL (used for chat and speech)
    pub api_base_url: String,

    /// Hidden system prompt, fixed for the process lifetime
    pub system_prompt: String,

    /// Speech configuration
    pub voice: VoiceConfig,

    /// Preferences file location
    pub preferences_path: PathBuf,
}

/// Speech configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Play synthesized replies on the speakers
    pub audio_enabled: bool,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS speed multiplier, clamped to `MIN_TTS_SPEED..=MAX_TTS_SPEED`
    pub tts_speed: f64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            audio_enabled: true,
            tts_model: "tts-1".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// Banter's config directory: `~/.config/banter`
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("banter"))
}

/// Banter's cache directory: `~/.cache/banter`
///
/// Not created here; writers create it on first use.
#[must_use]
pub fn cache_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from(".cache/banter"), |d| d.cache_dir().join("banter"))
}

impl Config {
    /// Load configuration from the config file and environment
    ///
    /// # Errors
    ///
    /// Returns error if the resolved configuration is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with an environment lookup (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if the model or base URL resolve to empty strings, or no
    /// preferences path can be determined
    pub fn resolve<F>(fc: file::BanterConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model = env("BANTER_MODEL")
            .or(fc.llm.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err(Error::Config("model must not be empty".to_string()));
        }

        let api_base_url = env("BANTER_API_BASE_URL")
            .or(fc.llm.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "api base URL must be http(s): {api_base_url}"
            )));
        }

        let system_prompt = match fc.llm.system_prompt {
            Some(p) if !p.trim().is_empty() => p,
            Some(_) => {
                tracing::warn!("empty system prompt in config file, using default");
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
            None => DEFAULT_SYSTEM_PROMPT.to_string(),
        };

        let defaults = VoiceConfig::default();
        let disable_audio = env("BANTER_DISABLE_AUDIO").is_some_and(|v| is_truthy(&v));
        let requested_speed = fc.voice.tts_speed.unwrap_or(defaults.tts_speed);
        let tts_speed = requested_speed.clamp(MIN_TTS_SPEED, MAX_TTS_SPEED);
        if (tts_speed - requested_speed).abs() > f64::EPSILON {
            tracing::warn!(requested = requested_speed, used = tts_speed, "tts speed out of range, clamped");
        }

        let voice = VoiceConfig {
            audio_enabled: !disable_audio && fc.voice.enabled.unwrap_or(defaults.audio_enabled),
            tts_model: env("BANTER_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(defaults.tts_model),
            tts_speed,
        };

        let preferences_path = crate::preferences::default_path().ok_or_else(|| {
            Error::Config("cannot determine config directory for preferences".to_string())
        })?;

        Ok(Self {
            model,
            api_base_url,
            system_prompt,
            voice,
            preferences_path,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

//! TOML configuration file loading
//!
//! Supports `~/.config/banter/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct BanterConfigFile {
    /// Completion API configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,
}

/// Completion-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Model identifier (e.g. "gpt-3.5-turbo")
    pub model: Option<String>,

    /// OpenAI-compatible base URL (e.g. "https://api.openai.com/v1")
    pub api_base_url: Option<String>,

    /// Hidden system prompt sent ahead of every conversation
    pub system_prompt: Option<String>,
}

/// Speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Play replies on the speakers (requires the `audio` feature)
    pub enabled: Option<bool>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `BanterConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> BanterConfigFile {
    let Some(path) = config_file_path() else {
        return BanterConfigFile::default();
    };

    if !path.exists() {
        return BanterConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => parse_or_default(&content, &path),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            BanterConfigFile::default()
        }
    }
}

fn parse_or_default(content: &str, path: &std::path::Path) -> BanterConfigFile {
    match toml::from_str(content) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse config file, using defaults"
            );
            BanterConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/banter/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    super::config_dir().map(|d| d.join("config.toml"))
}

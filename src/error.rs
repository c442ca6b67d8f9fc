//! Error types for Banter

use thiserror::Error;

/// Result type alias for Banter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Banter
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Completion API error (transport, status, or malformed reply)
    #[error("completion error: {0}")]
    Completion(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio output error
    #[error("audio error: {0}")]
    Audio(String),

    /// Preference store error
    #[error("preferences error: {0}")]
    Preferences(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML writing error
    #[error("toml write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

//! Persisted user preferences
//!
//! Two string settings survive restarts: the selected speech voice and the API
//! credential. They live in `~/.config/banter/preferences.toml`, are written only by
//! the settings surface, and every write is durable before it returns.

use std::io::Write;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Voice used until the user picks one (default English voice of the TTS endpoint)
pub const DEFAULT_VOICE: &str = "alloy";

/// Voices offered by the settings surface
pub const AVAILABLE_VOICES: &[&str] = &[
    "alloy", "ash", "coral", "echo", "fable", "nova", "onyx", "sage", "shimmer",
];

/// User preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Speech voice identifier
    #[serde(default = "default_voice")]
    pub selected_voice: String,

    /// Bearer credential for the completion and TTS APIs (no format validation)
    #[serde(default)]
    pub api_token: String,
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            selected_voice: default_voice(),
            api_token: String::new(),
        }
    }
}

impl Preferences {
    /// The credential wrapped for handing to HTTP clients
    #[must_use]
    pub fn credential(&self) -> SecretString {
        SecretString::from(self.api_token.clone())
    }

    /// Whether a credential has been stored
    #[must_use]
    pub fn has_credential(&self) -> bool {
        !self.api_token.is_empty()
    }
}

/// File-backed preference store
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// Store backed by an explicit file
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last written preferences
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(&self) -> Result<Preferences> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no preferences file, using defaults");
            return Ok(Preferences::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| {
            Error::Preferences(format!("failed to parse {}: {e}", self.path.display()))
        })
    }

    /// Write all preferences
    ///
    /// The file is replaced atomically so a crash never leaves it half written.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the write fails
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let body = toml::to_string(prefs)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(body.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::info!(path = %self.path.display(), "preferences saved");
        Ok(())
    }

    /// Update the selected voice
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read or written
    pub fn set_voice(&self, voice: &str) -> Result<Preferences> {
        let mut prefs = self.load()?;
        prefs.selected_voice = voice.to_string();
        self.save(&prefs)?;
        Ok(prefs)
    }

    /// Update the API credential
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read or written
    pub fn set_credential(&self, credential: &str) -> Result<Preferences> {
        let mut prefs = self.load()?;
        prefs.api_token = credential.to_string();
        self.save(&prefs)?;
        Ok(prefs)
    }
}

/// Return the preferences path: `~/.config/banter/preferences.toml`
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    crate::config::config_dir().map(|d| d.join("preferences.toml"))
}

//! Application context
//!
//! Owns the configuration and the user's preferences for the lifetime of the process
//! and builds the external capabilities from them. Components receive what they need
//! from here instead of reading shared global settings.

use std::sync::Arc;

use secrecy::SecretString;

use crate::completion::{CompletionProvider, OpenAiCompletion};
use crate::preferences::{PreferenceStore, Preferences};
use crate::voice::{AudioSink, OpenAiSpeech, SpeechSynthesizer, TextToSpeech};
use crate::{Config, Result};

/// Environment variable consulted when no credential has been stored
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration plus live preferences
pub struct App {
    config: Config,
    store: PreferenceStore,
    prefs: Preferences,
    env_credential: Option<String>,
}

impl App {
    /// Load preferences from the store named by `config`
    ///
    /// # Errors
    ///
    /// Returns error if the preferences file exists but cannot be read
    pub fn load(config: Config) -> Result<Self> {
        let store = PreferenceStore::at(config.preferences_path.clone());
        Self::with_store(config, store, std::env::var(API_KEY_ENV).ok())
    }

    /// Build from an explicit store and fallback credential
    ///
    /// # Errors
    ///
    /// Returns error if the preferences file exists but cannot be read
    pub fn with_store(
        config: Config,
        store: PreferenceStore,
        env_credential: Option<String>,
    ) -> Result<Self> {
        let prefs = store.load()?;
        tracing::debug!(
            path = %store.path().display(),
            voice = %prefs.selected_voice,
            has_credential = prefs.has_credential(),
            "loaded preferences"
        );
        Ok(Self {
            config,
            store,
            prefs,
            env_credential: env_credential.filter(|k| !k.is_empty()),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    #[must_use]
    pub fn voice(&self) -> &str {
        &self.prefs.selected_voice
    }

    /// Credential used for API calls: the stored one, else the environment fallback
    #[must_use]
    pub fn credential(&self) -> SecretString {
        if self.prefs.has_credential() {
            return self.prefs.credential();
        }
        SecretString::from(self.env_credential.clone().unwrap_or_default())
    }

    /// Whether any credential is available
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.prefs.has_credential() || self.env_credential.is_some()
    }

    /// Persist a new voice
    ///
    /// # Errors
    ///
    /// Returns error if the preferences cannot be written
    pub fn set_voice(&mut self, voice: &str) -> Result<()> {
        self.prefs = self.store.set_voice(voice)?;
        Ok(())
    }

    /// Persist a new credential
    ///
    /// # Errors
    ///
    /// Returns error if the preferences cannot be written
    pub fn set_credential(&mut self, credential: &str) -> Result<()> {
        self.prefs = self.store.set_credential(credential)?;
        Ok(())
    }

    /// Completion client for the current credential
    #[must_use]
    pub fn completion(&self) -> Arc<dyn CompletionProvider> {
        Arc::new(OpenAiCompletion::new(
            self.credential(),
            &self.config.api_base_url,
            self.config.model.clone(),
        ))
    }

    /// Speech capability for the current credential
    ///
    /// # Errors
    ///
    /// Returns error if no credential is available
    pub fn speech(&self) -> Result<Arc<dyn SpeechSynthesizer>> {
        let tts = TextToSpeech::new(
            self.credential(),
            &self.config.api_base_url,
            self.config.voice.tts_model.clone(),
            self.config.voice.tts_speed,
        )?;
        let sink = AudioSink::preferred(self.config.voice.audio_enabled);
        Ok(Arc::new(OpenAiSpeech::new(tts, sink)))
    }
}

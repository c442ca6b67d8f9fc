//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use banter::config::file::BanterConfigFile;
use banter::{
    App, ChatMessage, CompletionProvider, Config, Error, PreferenceStore, SpeechSynthesizer,
};
use tokio::sync::Semaphore;

/// Completion provider that replays canned replies and records every request
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<banter::Result<String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedProvider {
    /// Replies are handed out in order; an exhausted script yields an error
    #[must_use]
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            ..Self::default()
        }
    }

    /// Queue a failing reply
    #[must_use]
    pub fn then_fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(Error::Completion(message.to_string())));
        self
    }

    /// Queue a successful reply after whatever is already scripted
    #[must_use]
    pub fn then_reply(self, reply: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    /// Hold every reply until a permit is added to the returned semaphore
    #[must_use]
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, history: &[ChatMessage]) -> banter::Result<String> {
        self.requests.lock().unwrap().push(history.to_vec());

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .expect("gate closed")
                .forget();
        }

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Completion("script exhausted".to_string())))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Speech synthesizer that records what it was asked to say
#[derive(Default)]
pub struct RecordingSpeech {
    spoken: Mutex<Vec<(String, String)>>,
}

impl RecordingSpeech {
    /// `(text, voice)` pairs spoken so far
    pub fn spoken(&self) -> Vec<(String, String)> {
        self.spoken.lock().unwrap().clone()
    }

    /// Wait until at least `count` utterances arrived; speech runs on detached tasks
    pub async fn wait_for(&self, count: usize) -> Vec<(String, String)> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let spoken = self.spoken();
                if spoken.len() >= count {
                    return spoken;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("speech never arrived")
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSpeech {
    async fn speak(&self, text: &str, voice_id: &str) -> banter::Result<()> {
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), voice_id.to_string()));
        Ok(())
    }
}

/// Configuration with defaults and no environment influence
#[must_use]
pub fn test_config() -> Config {
    Config::resolve(BanterConfigFile::default(), |_| None).expect("default config is valid")
}

/// App backed by a preferences file inside `dir`
#[must_use]
pub fn test_app(dir: &tempfile::TempDir) -> App {
    let store = PreferenceStore::at(dir.path().join("preferences.toml"));
    App::with_store(test_config(), store, None).expect("failed to load test preferences")
}

//! Banter - terminal chat client with spoken replies
//!
//! This library provides the pieces of the Banter client:
//! - An in-memory conversation thread
//! - A turn controller that round-trips the thread through a completion API
//! - Speech output for replies
//! - Persisted user preferences (voice, API key)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Chat session (CLI)                  │
//! │      input lines  │  slash commands  │  rendering    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Turn controller                     │
//! │   Conversation  │  hidden system prompt  │  mpsc     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │         OpenAI-compatible API (external)             │
//! │        /chat/completions  │  /audio/speech           │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod chat;
pub mod completion;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod preferences;
pub mod setup;
pub mod voice;

pub use app::App;
pub use chat::{ChatSession, Command, LineEditor};
pub use completion::{ChatMessage, CompletionProvider, OpenAiCompletion, Role};
pub use config::Config;
pub use controller::{Completion, CompletionReceiver, TurnController, TurnUpdate};
pub use conversation::{Author, Conversation, Turn, TurnId, TurnStatus};
pub use error::{Error, Result};
pub use preferences::{PreferenceStore, Preferences};
pub use voice::{SpeechSynthesizer, speak_detached};

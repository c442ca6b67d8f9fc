//! Turn controller
//!
//! Orchestrates one round trip per user action: mutate the conversation, build the
//! outbound history, dispatch a single completion task, and fold the result back in.
//!
//! All conversation mutation happens on the task that owns the controller. Completion
//! tasks never touch the conversation; they report back over a channel tagged with the
//! id of the pending turn they target, and [`TurnController::apply`] mutates by that id.
//! A result whose target is no longer pending is stale and is dropped.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::completion::{ChatMessage, CompletionProvider};
use crate::conversation::{Author, Conversation, Turn, TurnId, TurnStatus};
use crate::Error;

/// Default hidden system prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an English coach with a sense of humor. \
You will correct grammatical or idiomatic errors during the conversation. \
You are going to play yourself as a young girl in her 20s. \
The conversation should be coherent, funny and friendly.";

/// Result of one completion task, addressed to the pending turn it fills
#[derive(Debug)]
pub struct Completion {
    pub turn_id: TurnId,
    pub result: crate::Result<String>,
}

/// Receiving half for completion results
pub type CompletionReceiver = mpsc::UnboundedReceiver<Completion>;

/// What applying a completion did to the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnUpdate {
    /// The pending turn now holds the reply
    Completed(TurnId),
    /// The pending turn is now failed
    Failed { id: TurnId, error: String },
    /// The target turn was superseded or removed; nothing changed
    Stale(TurnId),
}

/// Drives the conversation through send and regenerate round trips
pub struct TurnController {
    conversation: Conversation,
    provider: Arc<dyn CompletionProvider>,
    system_prompt: ChatMessage,
    results: mpsc::UnboundedSender<Completion>,
    in_flight: Option<(TurnId, AbortHandle)>,
}

impl TurnController {
    /// Create a controller and the receiver its completion results arrive on
    ///
    /// The owner must feed every received [`Completion`] back into [`Self::apply`].
    #[must_use]
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        system_prompt: impl Into<String>,
    ) -> (Self, CompletionReceiver) {
        let (results, rx) = mpsc::unbounded_channel();
        let controller = Self {
            conversation: Conversation::new(),
            provider,
            system_prompt: ChatMessage::system(system_prompt),
            results,
            in_flight: None,
        };
        (controller, rx)
    }

    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Use a different completion provider for subsequent requests
    ///
    /// A request already in flight keeps the provider it was dispatched with.
    pub fn set_provider(&mut self, provider: Arc<dyn CompletionProvider>) {
        self.provider = provider;
    }

    /// Whether a reply is still outstanding
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.conversation.pending().is_some()
    }

    /// Submit user text and request a reply
    ///
    /// Empty (or whitespace-only) input is ignored. While a reply is outstanding the
    /// call is rejected and the conversation is left untouched. Returns the id of the
    /// pending assistant turn on dispatch.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn send_turn(&mut self, user_text: &str) -> Option<TurnId> {
        if user_text.trim().is_empty() {
            return None;
        }

        if let Some(pending) = self.conversation.pending() {
            tracing::warn!(pending = %pending.id, "reply still outstanding, ignoring new turn");
            return None;
        }

        self.conversation.append(Turn::user(user_text));
        Some(self.dispatch())
    }

    /// Discard the latest reply and ask again
    ///
    /// Finds the newest user turn and removes the assistant turn right after it, if any,
    /// whether complete, failed, or still pending. A pending reply is superseded: its
    /// task is aborted and any late result is ignored. No-op without a user turn.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn regenerate_turn(&mut self) -> Option<TurnId> {
        let last_user = self.conversation.find_last_index_where(Turn::is_user)?;

        let follows = self
            .conversation
            .all()
            .get(last_user + 1)
            .is_some_and(|t| t.author == Author::Assistant);
        if follows {
            if let Some(removed) = self.conversation.remove_at(last_user + 1) {
                tracing::debug!(turn = %removed.id, status = ?removed.status, "removed reply for regeneration");
                self.cancel_in_flight(removed.id);
            }
        }

        Some(self.dispatch())
    }

    /// Outbound payload for the current conversation
    ///
    /// The hidden system prompt always comes first, followed by every completed turn in
    /// order. Pending placeholders and failed turns carry no text and are skipped.
    #[must_use]
    pub fn request_history(&self) -> Vec<ChatMessage> {
        std::iter::once(self.system_prompt.clone())
            .chain(
                self.conversation
                    .all()
                    .iter()
                    .filter(|t| t.status == TurnStatus::Complete)
                    .map(|t| match t.author {
                        Author::User => ChatMessage::user(t.text.clone()),
                        Author::Assistant => ChatMessage::assistant(t.text.clone()),
                    }),
            )
            .collect()
    }

    /// Fold a completion result into the conversation
    pub fn apply(&mut self, completion: Completion) -> TurnUpdate {
        let Completion { turn_id, result } = completion;

        if self.in_flight.as_ref().is_some_and(|(id, _)| *id == turn_id) {
            self.in_flight = None;
        }

        if !self.conversation.get(turn_id).is_some_and(Turn::is_pending) {
            tracing::debug!(turn = %turn_id, "dropping stale completion");
            return TurnUpdate::Stale(turn_id);
        }

        let (text, status) = match result {
            Ok(raw) => (raw.trim().to_string(), TurnStatus::Complete),
            Err(e) => {
                tracing::warn!(turn = %turn_id, error = %e, "completion failed");
                (String::new(), TurnStatus::Failed { error: e.to_string() })
            }
        };

        let update = match &status {
            TurnStatus::Failed { error } => TurnUpdate::Failed {
                id: turn_id,
                error: error.clone(),
            },
            _ => TurnUpdate::Completed(turn_id),
        };

        self.conversation.replace(
            turn_id,
            Turn {
                id: turn_id,
                text,
                author: Author::Assistant,
                status,
                created_at: Utc::now(),
            },
        );

        update
    }

    /// Append a pending turn and spawn the completion task for it
    fn dispatch(&mut self) -> TurnId {
        let history = self.request_history();
        let placeholder = Turn::pending();
        let turn_id = placeholder.id;
        self.conversation.append(placeholder);

        let provider = Arc::clone(&self.provider);
        let results = self.results.clone();

        tracing::info!(
            turn = %turn_id,
            provider = provider.name(),
            messages = history.len(),
            "requesting reply"
        );

        let request = tokio::spawn(async move { provider.complete(&history).await });
        let handle = request.abort_handle();

        // A request that panics still reports, so the turn never stays pending
        tokio::spawn(async move {
            let result = match request.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => return,
                Err(e) => Err(Error::Completion(format!("completion task failed: {e}"))),
            };
            // Receiver gone means the session ended; nothing left to update
            let _ = results.send(Completion { turn_id, result });
        });

        if let Some((previous, stale)) = self.in_flight.replace((turn_id, handle)) {
            tracing::debug!(turn = %previous, "superseded in-flight request");
            stale.abort();
        }

        turn_id
    }

    fn cancel_in_flight(&mut self, id: TurnId) {
        if self.in_flight.as_ref().is_some_and(|(current, _)| *current == id) {
            if let Some((_, handle)) = self.in_flight.take() {
                handle.abort();
                tracing::debug!(turn = %id, "aborted in-flight request");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct Echo;

    #[async_trait]
    impl CompletionProvider for Echo {
        async fn complete(&self, history: &[ChatMessage]) -> crate::Result<String> {
            Ok(format!("  echo: {}  \n", history.len()))
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    struct Panics;

    #[async_trait]
    impl CompletionProvider for Panics {
        async fn complete(&self, _history: &[ChatMessage]) -> crate::Result<String> {
            panic!("provider bug")
        }

        fn name(&self) -> &'static str {
            "panics"
        }
    }

    fn controller() -> (TurnController, CompletionReceiver) {
        TurnController::new(Arc::new(Echo), "system")
    }

    #[tokio::test]
    async fn whitespace_only_input_is_ignored() {
        let (mut ctl, _rx) = controller();
        assert!(ctl.send_turn("   \n").is_none());
        assert!(ctl.conversation().is_empty());
    }

    #[tokio::test]
    async fn history_skips_pending_and_failed() {
        let (mut ctl, _rx) = controller();
        ctl.conversation.append(Turn::user("hi"));
        let mut failed = Turn::pending();
        failed.status = TurnStatus::Failed {
            error: "boom".to_string(),
        };
        ctl.conversation.append(failed);
        ctl.conversation.append(Turn::user("again"));
        ctl.conversation.append(Turn::pending());

        let history = ctl.request_history();
        assert_eq!(
            history,
            vec![
                ChatMessage::system("system"),
                ChatMessage::user("hi"),
                ChatMessage::user("again"),
            ]
        );
    }

    #[tokio::test]
    async fn apply_replaces_in_place() {
        let (mut ctl, mut rx) = controller();
        let pending = ctl.send_turn("hi").unwrap();
        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.turn_id, pending);

        assert_eq!(ctl.apply(completion), TurnUpdate::Completed(pending));
        let reply = &ctl.conversation().all()[1];
        assert_eq!(reply.id, pending);
        // system + "hi"
        assert_eq!(reply.text, "echo: 2");
        assert!(ctl.in_flight.is_none());
    }

    #[tokio::test]
    async fn panicking_request_fails_the_turn() {
        let (mut ctl, mut rx) = TurnController::new(Arc::new(Panics), "system");
        let pending = ctl.send_turn("hi").unwrap();

        let update = ctl.apply(rx.recv().await.unwrap());
        assert!(matches!(update, TurnUpdate::Failed { id, .. } if id == pending));
        assert!(!ctl.is_pending());
        assert!(ctl.conversation().all()[1].is_failed());
    }

    #[tokio::test]
    async fn unknown_turn_is_stale() {
        let (mut ctl, _rx) = controller();
        let id = TurnId::new();
        let update = ctl.apply(Completion {
            turn_id: id,
            result: Err(Error::Completion("late".to_string())),
        });
        assert_eq!(update, TurnUpdate::Stale(id));
        assert!(ctl.conversation().is_empty());
    }
}

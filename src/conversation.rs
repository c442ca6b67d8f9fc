//! In-memory conversation thread
//!
//! The conversation is an ordered list of turns; insertion order is chronological
//! order. It is never persisted and lives only as long as the process.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Opaque unique identifier of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnId(Uuid);

impl TurnId {
    /// Generate a fresh identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Who wrote a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

/// Lifecycle state of a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    /// Final text is present
    Complete,
    /// Waiting on the completion API
    Pending,
    /// The completion call failed; `error` describes why
    Failed { error: String },
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub id: TurnId,
    pub text: String,
    pub author: Author,
    pub status: TurnStatus,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// A completed turn written by the user
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text.into(), Author::User, TurnStatus::Complete)
    }

    /// A completed turn written by the assistant
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(text.into(), Author::Assistant, TurnStatus::Complete)
    }

    /// An assistant placeholder awaiting its reply
    #[must_use]
    pub fn pending() -> Self {
        Self::new(String::new(), Author::Assistant, TurnStatus::Pending)
    }

    fn new(text: String, author: Author, status: TurnStatus) -> Self {
        Self {
            id: TurnId::new(),
            text,
            author,
            status,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == TurnStatus::Pending
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.status, TurnStatus::Failed { .. })
    }
}

/// Ordered sequence of turns
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append a turn at the end of the thread
    pub fn append(&mut self, turn: Turn) {
        debug_assert!(
            self.position(turn.id).is_none(),
            "turn ids must be unique within a conversation"
        );
        self.turns.push(turn);
    }

    /// Remove and return the newest turn
    pub fn remove_last(&mut self) -> Option<Turn> {
        self.turns.pop()
    }

    /// Remove the turn at `index`, or `None` when out of range
    pub fn remove_at(&mut self, index: usize) -> Option<Turn> {
        (index < self.turns.len()).then(|| self.turns.remove(index))
    }

    /// Index of the newest turn matching `predicate`
    pub fn find_last_index_where<P>(&self, predicate: P) -> Option<usize>
    where
        P: Fn(&Turn) -> bool,
    {
        self.turns.iter().rposition(predicate)
    }

    /// All turns in chronological order
    #[must_use]
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    /// Index of the turn with `id`
    #[must_use]
    pub fn position(&self, id: TurnId) -> Option<usize> {
        self.turns.iter().position(|t| t.id == id)
    }

    #[must_use]
    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    /// Replace the turn with `id` in place, keeping its position
    ///
    /// Returns `false` if no such turn exists.
    pub fn replace(&mut self, id: TurnId, turn: Turn) -> bool {
        match self.turns.iter_mut().find(|t| t.id == id) {
            Some(slot) => {
                *slot = turn;
                true
            }
            None => false,
        }
    }

    /// Remove the turn with `id`
    pub fn remove(&mut self, id: TurnId) -> Option<Turn> {
        self.position(id).and_then(|i| self.remove_at(i))
    }

    /// The outstanding pending turn, if any
    #[must_use]
    pub fn pending(&self) -> Option<&Turn> {
        self.turns.iter().find(|t| t.is_pending())
    }

    /// Newest completed assistant reply
    #[must_use]
    pub fn last_reply(&self) -> Option<&Turn> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.author == Author::Assistant && t.status == TurnStatus::Complete)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

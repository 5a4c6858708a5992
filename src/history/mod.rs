//! Session memory: the rolling per-conversation window of prior turns.
//!
//! The store is a plain key-value capability (`get`/`put`) so the turn
//! pipeline does not care whether history lives in process memory or in
//! SQLite. Ordering of writes within a session is enforced separately by
//! [`SessionLocks`].

mod locks;
mod memory;
mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use locks::{SessionGuard, SessionLocks};
pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store backend error: {0}")]
    Backend(String),
    #[error("corrupt session history: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Conversation state for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub history: Vec<HistoryEntry>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            history: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Commits a completed turn and evicts the oldest entries beyond `window`.
    pub fn record_turn(&mut self, user: &str, assistant: &str, window: usize) {
        self.history.push(HistoryEntry::user(user));
        self.history.push(HistoryEntry::assistant(assistant));
        if self.history.len() > window {
            let excess = self.history.len() - window;
            self.history.drain(..excess);
        }
    }
}

/// Keyed session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the stored state, or a fresh empty state for unknown sessions.
    async fn get(&self, session_id: &str) -> Result<SessionState, StoreError>;

    /// Replaces the stored state for `session_id`.
    async fn put(&self, session_id: &str, state: SessionState) -> Result<(), StoreError>;
}

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SessionState, SessionStore, StoreError};

/// Volatile store; history lives for the lifetime of the process.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<SessionState, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .cloned()
            .unwrap_or_else(|| SessionState::new(session_id)))
    }

    async fn put(&self, session_id: &str, state: SessionState) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let store = MemorySessionStore::new();
        let state = store.get("conv-1").await.unwrap();
        assert_eq!(state.session_id, "conv-1");
        assert!(state.is_empty());
        // reads never create entries
        assert_eq!(store.len().await, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = MemorySessionStore::new();
        let mut a = store.get("a").await.unwrap();
        a.record_turn("hello", "hi", 6);
        store.put("a", a.clone()).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), a);
        assert!(store.get("b").await.unwrap().is_empty());
    }
}

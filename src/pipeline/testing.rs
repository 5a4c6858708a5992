//! Fake collaborators shared by the pipeline tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::bot::{Activity, ChannelConnector, ConnectorError};
use crate::history::{MemorySessionStore, SessionState, SessionStore, StoreError};
use crate::llm::{ChatRequest, CompletionClient, LlmError};
use crate::rag::{SearchError, SearchIndex, SearchRecord, VectorQuery};

type Responder = dyn Fn(&ChatRequest) -> Result<String, LlmError> + Send + Sync;

pub struct ScriptedCompletion {
    responder: Box<Responder>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedCompletion {
    pub fn answering<F>(responder: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::answering(|_| Err(LlmError::Transport("connection reset".to_string())))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&request)
    }
}

pub struct StaticIndex {
    pub records: Vec<SearchRecord>,
    pub fail: bool,
    pub queries: Mutex<Vec<VectorQuery>>,
}

impl StaticIndex {
    pub fn with(records: Vec<SearchRecord>) -> Self {
        Self {
            records,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn down() -> Self {
        Self {
            fail: true,
            ..Self::with(Vec::new())
        }
    }

    pub fn query_texts(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .map(|q| q.text.clone())
            .collect()
    }
}

#[async_trait]
impl SearchIndex for StaticIndex {
    async fn search(&self, query: &VectorQuery) -> Result<Vec<SearchRecord>, SearchError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(SearchError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.records.clone())
    }
}

#[derive(Default)]
pub struct RecordingConnector {
    pub fail: bool,
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingConnector {
    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl ChannelConnector for RecordingConnector {
    async fn send_text(&self, activity: &Activity, text: &str) -> Result<(), ConnectorError> {
        if self.fail {
            return Err(ConnectorError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        let recipient = activity
            .from
            .as_ref()
            .map(|f| f.id.clone())
            .unwrap_or_default();
        self.sent.lock().unwrap().push((recipient, text.to_string()));
        Ok(())
    }
}

/// Memory store whose reads or writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemorySessionStore,
    pub fail_get: bool,
    pub fail_put: bool,
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn get(&self, session_id: &str) -> Result<SessionState, StoreError> {
        if self.fail_get {
            return Err(StoreError::Backend("database is locked".to_string()));
        }
        self.inner.get(session_id).await
    }

    async fn put(&self, session_id: &str, state: SessionState) -> Result<(), StoreError> {
        if self.fail_put {
            return Err(StoreError::Backend("disk I/O error".to_string()));
        }
        self.inner.put(session_id, state).await
    }
}

use async_trait::async_trait;
use thiserror::Error;

use super::types::ChatRequest;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion client not configured: {0} is empty")]
    NotConfigured(&'static str),
    #[error("completion request failed: {0}")]
    Transport(String),
    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid completion response: {0}")]
    Decode(String),
}

/// Chat-completion backend shared by the rewrite and generation stages.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the text of the first choice.
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::bot::{ActivityError, ConnectorError};
use crate::history::StoreError;
use crate::llm::LlmError;
use crate::rag::SearchError;

/// Pipeline position of a turn, reported when a stage exceeds its time limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Loading,
    Retrieving,
    Generating,
    Replying,
    Persisting,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnStage::Loading => "loading",
            TurnStage::Retrieving => "retrieving",
            TurnStage::Generating => "generating",
            TurnStage::Replying => "replying",
            TurnStage::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// A failed turn. Whatever the variant, no session history was committed.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("invalid activity: {0}")]
    Activity(#[from] ActivityError),
    #[error("{stage} timed out after {limit:?}")]
    Timeout { stage: TurnStage, limit: Duration },
    #[error("session store failed: {0}")]
    Store(#[from] StoreError),
    #[error("search unavailable: {0}")]
    Retrieval(#[from] SearchError),
    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),
    #[error("reply delivery failed: {0}")]
    Delivery(#[from] ConnectorError),
}

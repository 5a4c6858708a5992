//! SearchIndex trait: the external document index the retriever queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search client not configured: {0} is empty")]
    NotConfigured(&'static str),
    #[error("search request failed: {0}")]
    Transport(String),
    #[error("search endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid search response: {0}")]
    Decode(String),
}

/// A text query vectorized by the index itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorQuery {
    pub text: String,
    /// Number of nearest neighbors to return.
    pub k: usize,
    /// Vector field searched against.
    pub fields: String,
    /// Disables approximate search.
    pub exhaustive: bool,
    /// Record fields to return.
    pub select: Vec<String>,
}

/// One hit. Either field may be missing on partially populated records.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchRecord {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Returns hits in relevance order, at most `query.k` of them.
    async fn search(&self, query: &VectorQuery) -> Result<Vec<SearchRecord>, SearchError>;
}

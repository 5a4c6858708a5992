use std::fmt;
use std::sync::Arc;

use super::store::{SearchError, SearchIndex, SearchRecord, VectorQuery};
use crate::core::config::SearchSettings;

/// Label used when an index record carries no `source`.
const DEFAULT_SOURCE: &str = "Doc";

#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverConfig {
    pub k: usize,
    pub vector_field: String,
    pub exhaustive: bool,
    pub select: Vec<String>,
}

impl From<&SearchSettings> for RetrieverConfig {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            k: settings.neighbors,
            vector_field: settings.vector_field.clone(),
            exhaustive: settings.exhaustive,
            select: settings.select.clone(),
        }
    }
}

/// A source-labeled passage, scoped to a single turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedChunk {
    pub source: String,
    pub content: String,
}

impl From<SearchRecord> for RetrievedChunk {
    fn from(record: SearchRecord) -> Self {
        Self {
            source: record.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            content: record.content.unwrap_or_default(),
        }
    }
}

impl fmt::Display for RetrievedChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.source, self.content)
    }
}

/// Runs the vector query and normalizes hits. No reranking, filtering or
/// deduplication: the index's order is the answer's order.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn SearchIndex>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(index: Arc<dyn SearchIndex>, config: RetrieverConfig) -> Self {
        Self { index, config }
    }

    /// An empty result means "no documents found"; an error means the index
    /// could not be queried.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, SearchError> {
        let vector_query = VectorQuery {
            text: query.to_string(),
            k: self.config.k,
            fields: self.config.vector_field.clone(),
            exhaustive: self.config.exhaustive,
            select: self.config.select.clone(),
        };

        let records = self.index.search(&vector_query).await?;
        tracing::debug!("Search returned {} records for {:?}", records.len(), query);

        Ok(records
            .into_iter()
            .take(self.config.k)
            .map(RetrievedChunk::from)
            .collect())
    }
}

/// Renders chunks as `"[source] content"` strings.
pub fn render_chunks(chunks: &[RetrievedChunk]) -> Vec<String> {
    chunks.iter().map(ToString::to_string).collect()
}

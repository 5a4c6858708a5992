//! Retrieval-augmented generation: document lookup against the search index.
//!
//! This module provides:
//! - `SearchIndex`: the external index abstraction and its Azure AI Search client
//! - `Retriever`: issues the vector query and renders hits into labeled chunks

mod azure_search;
mod retriever;
mod store;

pub use azure_search::AzureSearchClient;
pub use retriever::{render_chunks, RetrievedChunk, Retriever, RetrieverConfig};
pub use store::{SearchError, SearchIndex, SearchRecord, VectorQuery};

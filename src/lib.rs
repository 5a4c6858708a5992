//! Retrieval-augmented chat bot backend.
//!
//! A channel webhook receives activities; each message turn rewrites the
//! utterance into a standalone query, retrieves passages from Azure AI Search,
//! answers with Azure OpenAI, replies through the Bot Connector and then
//! commits the turn to the session's rolling history.

pub mod bot;
pub mod core;
pub mod history;
pub mod llm;
pub mod pipeline;
pub mod rag;
pub mod server;
pub mod state;
pub mod telemetry;

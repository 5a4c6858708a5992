//! Per-turn RAG pipeline: query rewrite, retrieval, grounded generation and
//! the rolling memory update, sequenced by [`TurnOrchestrator`].

mod error;
mod generate;
mod orchestrator;
mod rewrite;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{TurnError, TurnStage};
pub use generate::{build_answer_messages, AnswerGenerator, ANSWER_INSTRUCTION};
pub use orchestrator::{OrchestratorConfig, TurnOrchestrator, TurnOutcome};
pub use rewrite::{build_rewrite_request, QueryRewriter, REWRITE_HISTORY_ENTRIES, REWRITE_INSTRUCTION};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::error::{TurnError, TurnStage};
use super::generate::{build_answer_messages, AnswerGenerator};
use super::rewrite::QueryRewriter;
use crate::bot::{Activity, ActivityKind, ChannelAccount, ChannelConnector};
use crate::core::config::defaults::{DEFAULT_GREETING, DEFAULT_HISTORY_WINDOW, DEFAULT_REWRITE_TEMPERATURE, DEFAULT_TIMEOUT_SECS};
use crate::core::config::Settings;
use crate::history::{SessionLocks, SessionStore};
use crate::llm::CompletionClient;
use crate::rag::{render_chunks, RetrievedChunk, Retriever};
use crate::telemetry::{Span, TraceSink};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub history_window: usize,
    pub greeting: String,
    pub rewrite_temperature: f64,
    pub store_timeout: Duration,
    pub search_timeout: Duration,
    pub completion_timeout: Duration,
    pub delivery_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            greeting: DEFAULT_GREETING.to_string(),
            rewrite_temperature: DEFAULT_REWRITE_TEMPERATURE,
            store_timeout: timeout,
            search_timeout: timeout,
            completion_timeout: timeout,
            delivery_timeout: timeout,
        }
    }
}

impl From<&Settings> for OrchestratorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            history_window: settings.memory.history_window,
            greeting: settings.bot.greeting.clone(),
            rewrite_temperature: settings.openai.rewrite_temperature,
            store_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            search_timeout: settings.search.timeout(),
            completion_timeout: settings.openai.timeout(),
            delivery_timeout: settings.bot.timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Replied,
    Greeted(usize),
    Ignored,
}

/// Runs one inbound activity to completion.
///
/// Message turns hold their session's lock from load to persist, so turns of
/// one conversation apply in arrival order while other sessions proceed in
/// parallel. Any failure aborts the turn before history is written.
pub struct TurnOrchestrator {
    store: Arc<dyn SessionStore>,
    locks: SessionLocks,
    rewriter: QueryRewriter,
    retriever: Retriever,
    generator: AnswerGenerator,
    connector: Arc<dyn ChannelConnector>,
    tracer: Arc<dyn TraceSink>,
    config: OrchestratorConfig,
}

async fn bounded<T, E, F>(stage: TurnStage, limit: Duration, fut: F) -> Result<T, TurnError>
where
    F: Future<Output = Result<T, E>>,
    TurnError: From<E>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(TurnError::from),
        Err(_) => Err(TurnError::Timeout { stage, limit }),
    }
}

fn traced<T>(span: &Span, result: Result<T, TurnError>) -> Result<T, TurnError> {
    if let Err(err) = &result {
        span.record_error(&err.to_string());
    }
    result
}

impl TurnOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        completion: Arc<dyn CompletionClient>,
        retriever: Retriever,
        connector: Arc<dyn ChannelConnector>,
        tracer: Arc<dyn TraceSink>,
        config: OrchestratorConfig,
    ) -> Self {
        let rewriter = QueryRewriter::new(
            completion.clone(),
            config.rewrite_temperature,
            config.completion_timeout,
        );
        Self {
            store,
            locks: SessionLocks::new(),
            rewriter,
            retriever,
            generator: AnswerGenerator::new(completion),
            connector,
            tracer,
            config,
        }
    }

    pub async fn handle(&self, activity: &Activity) -> Result<TurnOutcome, TurnError> {
        match activity.kind()? {
            ActivityKind::Message { session_id, text } => {
                self.on_message(activity, session_id, text).await?;
                Ok(TurnOutcome::Replied)
            }
            ActivityKind::MembersAdded(members) => {
                let greeted = self.on_members_added(activity, members).await?;
                Ok(TurnOutcome::Greeted(greeted))
            }
            ActivityKind::Other => {
                tracing::debug!("Ignoring activity of type {:?}", activity.activity_type);
                Ok(TurnOutcome::Ignored)
            }
        }
    }

    async fn on_message(
        &self,
        activity: &Activity,
        session_id: &str,
        text: &str,
    ) -> Result<(), TurnError> {
        let turn_id = Uuid::new_v4();
        let _session = self.locks.acquire(session_id).await;

        let root = self.tracer.start_root("teams_turn");
        root.set_attribute("session_id", session_id);
        root.set_attribute("turn_id", turn_id.to_string());
        root.set_attribute("input.value", text);

        let result = self.run_message(activity, session_id, text, &root).await;
        match &result {
            Ok(()) => tracing::info!("Turn {} completed for session {}", turn_id, session_id),
            Err(err) => {
                root.record_error(&err.to_string());
                tracing::error!("Turn {} failed for session {}: {}", turn_id, session_id, err);
            }
        }
        result
    }

    /// Load, rewrite, retrieve, generate, reply, then persist.
    ///
    /// The reply goes out before the new window is stored: a failed delivery
    /// leaves history untouched, while a failed persist after delivery fails
    /// the turn with the answer already sent and the window unchanged.
    async fn run_message(
        &self,
        activity: &Activity,
        session_id: &str,
        text: &str,
        root: &Span,
    ) -> Result<(), TurnError> {
        let mut state = bounded(
            TurnStage::Loading,
            self.config.store_timeout,
            self.store.get(session_id),
        )
        .await?;

        let search_query = self.rewriter.search_query(&state.history, text, root).await;

        let chunks = self.retrieve(&search_query, root).await?;

        let answer = {
            let span = root.child("llm_generation");
            let messages = build_answer_messages(&chunks, &state.history, text);
            span.set_attribute(
                "llm.input_messages",
                serde_json::to_string(&messages).unwrap_or_default(),
            );
            span.set_attribute("openinference.span.kind", "LLM");

            let answer = traced(
                &span,
                bounded(
                    TurnStage::Generating,
                    self.config.completion_timeout,
                    self.generator.generate(messages),
                )
                .await,
            )?;
            span.set_attribute("output.value", answer.as_str());
            answer
        };
        root.set_attribute("output.value", answer.as_str());

        state.record_turn(text, &answer, self.config.history_window);

        bounded(
            TurnStage::Replying,
            self.config.delivery_timeout,
            self.connector.send_text(activity, &answer),
        )
        .await?;

        bounded(
            TurnStage::Persisting,
            self.config.store_timeout,
            self.store.put(session_id, state),
        )
        .await
    }

    async fn retrieve(&self, query: &str, root: &Span) -> Result<Vec<RetrievedChunk>, TurnError> {
        let span = root.child("azure_search");
        span.set_attribute("search.query", query);

        let chunks = traced(
            &span,
            bounded(
                TurnStage::Retrieving,
                self.config.search_timeout,
                self.retriever.retrieve(query),
            )
            .await,
        )?;

        if chunks.is_empty() {
            tracing::info!("No documents found for query {:?}", query);
        }

        let documents = serde_json::to_string(&render_chunks(&chunks)).unwrap_or_default();
        span.set_attribute("retrieval.documents", documents.as_str());
        root.set_attribute("retrieval.documents", documents);
        Ok(chunks)
    }

    /// Greets every added member except the bot itself.
    async fn on_members_added(
        &self,
        activity: &Activity,
        members: &[ChannelAccount],
    ) -> Result<usize, TurnError> {
        let bot_id = activity.recipient_id();
        let mut greeted = 0;

        for member in members {
            if Some(member.id.as_str()) == bot_id {
                continue;
            }
            bounded(
                TurnStage::Replying,
                self.config.delivery_timeout,
                self.connector.send_text(activity, &self.config.greeting),
            )
            .await?;
            greeted += 1;
        }

        Ok(greeted)
    }
}

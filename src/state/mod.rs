use std::sync::Arc;

use crate::bot::{BotAuthValidator, BotConnectorClient, ChannelConnector, DeliveryValidator};
use crate::core::config::Settings;
use crate::history::{MemorySessionStore, SessionStore, SqliteSessionStore};
use crate::llm::{AzureOpenAiClient, CompletionClient};
use crate::pipeline::{OrchestratorConfig, TurnOrchestrator};
use crate::rag::{AzureSearchClient, Retriever, RetrieverConfig, SearchIndex};
use crate::telemetry::{build_trace_sink, TraceSink};

pub mod error;

use error::InitializationError;

/// Process-wide state shared by the HTTP handlers.
///
/// Everything here is immutable after startup except the session store,
/// which the orchestrator owns and serializes per session.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub orchestrator: Arc<TurnOrchestrator>,
    pub validator: Arc<dyn DeliveryValidator>,
    pub tracer: Arc<dyn TraceSink>,
}

/// Externally supplied collaborators, used by [`AppState::from_parts`].
pub struct Collaborators {
    pub store: Arc<dyn SessionStore>,
    pub completion: Arc<dyn CompletionClient>,
    pub index: Arc<dyn SearchIndex>,
    pub connector: Arc<dyn ChannelConnector>,
    pub validator: Arc<dyn DeliveryValidator>,
    pub tracer: Arc<dyn TraceSink>,
}

impl AppState {
    /// Builds the production collaborators from `settings`.
    ///
    /// Session history goes to SQLite when `memory.sqlite_path` is set and
    /// stays in process memory otherwise. Missing endpoints or keys do not
    /// fail here; the owning client reports them on first use.
    pub async fn initialize(settings: Settings) -> Result<Arc<Self>, InitializationError> {
        let store: Arc<dyn SessionStore> = match &settings.memory.sqlite_path {
            Some(path) => {
                tracing::info!("Persisting session history to {}", path.display());
                Arc::new(
                    SqliteSessionStore::new(path)
                        .await
                        .map_err(|e| InitializationError::SessionStore(e.into()))?,
                )
            }
            None => {
                tracing::info!("Keeping session history in memory");
                Arc::new(MemorySessionStore::new())
            }
        };

        let completion = Arc::new(
            AzureOpenAiClient::new(&settings.openai)
                .map_err(|e| InitializationError::Llm(e.into()))?,
        );
        let index = Arc::new(
            AzureSearchClient::new(&settings.search)
                .map_err(|e| InitializationError::Search(e.into()))?,
        );
        let connector = Arc::new(
            BotConnectorClient::new(&settings.bot)
                .map_err(|e| InitializationError::Connector(e.into()))?,
        );
        let validator = Arc::new(BotAuthValidator::new(settings.bot.app_id.clone()));
        let tracer = build_trace_sink(&settings.telemetry);

        Ok(Self::from_parts(
            settings,
            Collaborators {
                store,
                completion,
                index,
                connector,
                validator,
                tracer,
            },
        ))
    }

    pub fn from_parts(settings: Settings, parts: Collaborators) -> Arc<Self> {
        let retriever = Retriever::new(parts.index, RetrieverConfig::from(&settings.search));
        let orchestrator = TurnOrchestrator::new(
            parts.store,
            parts.completion,
            retriever,
            parts.connector,
            parts.tracer.clone(),
            OrchestratorConfig::from(&settings),
        );

        Arc::new(AppState {
            settings: Arc::new(settings),
            orchestrator: Arc::new(orchestrator),
            validator: parts.validator,
            tracer: parts.tracer,
        })
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to initialize session store: {0}")]
    SessionStore(#[source] anyhow::Error),

    #[error("Failed to initialize search client: {0}")]
    Search(#[source] anyhow::Error),

    #[error("Failed to initialize completion client: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to initialize bot connector: {0}")]
    Connector(#[source] anyhow::Error),
}

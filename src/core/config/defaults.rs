//! Built-in defaults applied before the YAML overlay and the environment.

pub const DEFAULT_PORT: u16 = 3978;

pub const DEFAULT_OPENAI_DEPLOYMENT: &str = "gpt-4";
pub const DEFAULT_OPENAI_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_REWRITE_TEMPERATURE: f64 = 0.3;

pub const DEFAULT_SEARCH_API_VERSION: &str = "2024-07-01";
pub const DEFAULT_VECTOR_FIELD: &str = "contentVector";
pub const DEFAULT_NEIGHBORS: usize = 3;

pub const DEFAULT_COLLECTOR_ENDPOINT: &str = "https://otlp.arize.com/v1/traces";
pub const DEFAULT_SERVICE_NAME: &str = "teams-rag-bot";

pub const DEFAULT_LOGIN_URL: &str =
    "https://login.microsoftonline.com/botframework.com/oauth2/v2.0/token";
pub const DEFAULT_CONNECTOR_SCOPE: &str = "https://api.botframework.com/.default";
pub const DEFAULT_GREETING: &str =
    "Hello! I am your RAG Assistant. Ask me anything about your documents.";

/// Last three user/assistant pairs.
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub fn default_select_fields() -> Vec<String> {
    vec!["content".to_string(), "source".to_string()]
}

pub mod defaults;
pub mod service;

pub use service::{
    BotSettings, MemorySettings, OpenAiSettings, SearchSettings, ServerSettings, Settings,
    TelemetrySettings,
};

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::defaults::*;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 6] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "credential",
    "private_key",
];

const CONFIG_PATH_ENV: &str = "RAGBOT_CONFIG_PATH";

/// Immutable service configuration, resolved once at startup.
///
/// Resolution order: built-in defaults, then the optional YAML file named by
/// `RAGBOT_CONFIG_PATH`, then environment variables. A missing value never
/// fails startup; it stays empty and the owning collaborator fails on first use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub bot: BotSettings,
    pub search: SearchSettings,
    pub openai: OpenAiSettings,
    pub telemetry: TelemetrySettings,
    pub memory: MemorySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    pub app_id: String,
    pub app_password: String,
    pub login_url: String,
    pub connector_scope: String,
    pub greeting: String,
    pub timeout_secs: u64,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_password: String::new(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            connector_scope: DEFAULT_CONNECTOR_SCOPE.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub endpoint: String,
    pub api_key: String,
    pub index: String,
    pub api_version: String,
    pub vector_field: String,
    pub select: Vec<String>,
    pub neighbors: usize,
    pub exhaustive: bool,
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            index: String::new(),
            api_version: DEFAULT_SEARCH_API_VERSION.to_string(),
            vector_field: DEFAULT_VECTOR_FIELD.to_string(),
            select: default_select_fields(),
            neighbors: DEFAULT_NEIGHBORS,
            exhaustive: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub rewrite_temperature: f64,
    pub timeout_secs: u64,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: DEFAULT_OPENAI_DEPLOYMENT.to_string(),
            api_version: DEFAULT_OPENAI_API_VERSION.to_string(),
            rewrite_temperature: DEFAULT_REWRITE_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub collector_endpoint: String,
    pub space_id: String,
    pub api_key: String,
    pub service_name: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            collector_endpoint: DEFAULT_COLLECTOR_ENDPOINT.to_string(),
            space_id: String::new(),
            api_key: String::new(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub history_window: usize,
    /// SQLite file for durable session history. In-memory when unset.
    pub sqlite_path: Option<PathBuf>,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            sqlite_path: None,
        }
    }
}

impl SearchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl OpenAiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl BotSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Resolves settings from the process environment.
    ///
    /// Returns the settings with any problems found along the way. They are
    /// returned rather than logged because this runs before the subscriber is
    /// installed.
    pub fn load() -> (Self, Vec<String>) {
        Self::load_from(|name| env::var(name).ok())
    }

    fn load_from<F>(lookup: F) -> (Self, Vec<String>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let mut settings = match lookup(CONFIG_PATH_ENV).filter(|path| !path.trim().is_empty()) {
            Some(path) => load_yaml_file(Path::new(&path)).unwrap_or_else(|err| {
                warnings.push(err);
                Settings::default()
            }),
            None => Settings::default(),
        };
        settings.apply_env(lookup);
        warnings.extend(settings.validate());
        (settings, warnings)
    }

    /// Replaces values that would break runtime invariants with defaults.
    ///
    /// The history window must hold whole user/assistant pairs.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        let window = self.memory.history_window;
        if window == 0 || window % 2 != 0 {
            warnings.push(format!(
                "memory.history_window must be a positive even number, got {}; using {}",
                window, DEFAULT_HISTORY_WINDOW
            ));
            self.memory.history_window = DEFAULT_HISTORY_WINDOW;
        }
        warnings
    }

    /// Overrides fields from environment-style variables, using the same
    /// names the Azure bot templates use.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, name: &str| {
            if let Some(value) = lookup(name) {
                *target = value;
            }
        };

        set(&mut self.bot.app_id, "MicrosoftAppId");
        set(&mut self.bot.app_password, "MicrosoftAppPassword");

        set(&mut self.search.endpoint, "AZURE_SEARCH_ENDPOINT");
        set(&mut self.search.api_key, "AZURE_SEARCH_KEY");
        set(&mut self.search.index, "AZURE_SEARCH_INDEX");

        set(&mut self.openai.endpoint, "AZURE_OPENAI_ENDPOINT");
        set(&mut self.openai.api_key, "AZURE_OPENAI_KEY");
        set(&mut self.openai.deployment, "AZURE_OPENAI_DEPLOYMENT");

        set(&mut self.telemetry.collector_endpoint, "ARIZE_COLLECTOR_ENDPOINT");
        set(&mut self.telemetry.space_id, "ARIZE_SPACE_ID");
        set(&mut self.telemetry.api_key, "ARIZE_API_KEY");

        if let Some(port) = lookup("PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(dir) = lookup("RAGBOT_LOG_DIR").filter(|v| !v.trim().is_empty()) {
            self.server.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup("RAGBOT_SESSION_DB").filter(|v| !v.trim().is_empty()) {
            self.memory.sqlite_path = Some(PathBuf::from(path));
        }
    }

    /// JSON view of the settings with credentials masked, for startup logs.
    pub fn redacted(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(value) => redact_sensitive_values(&value),
            Err(_) => Value::Null,
        }
    }
}

fn load_yaml_file(path: &Path) -> Result<Settings, String> {
    if !path.exists() {
        return Err(format!("Config file {} not found; using defaults", path.display()));
    }

    let contents = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read config file {}: {}; using defaults", path.display(), err))?;

    serde_yaml::from_str::<Settings>(&contents)
        .map_err(|err| format!("Failed to parse config file {}: {}; using defaults", path.display(), err))
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                let is_set = val.as_str().map(|s| !s.is_empty()).unwrap_or(!val.is_null());
                if is_sensitive_key(key) && is_set {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 3978);
        assert_eq!(settings.openai.deployment, "gpt-4");
        assert_eq!(settings.search.neighbors, 3);
        assert!(settings.search.exhaustive);
        assert_eq!(settings.search.vector_field, "contentVector");
        assert_eq!(settings.search.select, vec!["content", "source"]);
        assert_eq!(settings.memory.history_window, 6);
        assert_eq!(
            settings.telemetry.collector_endpoint,
            "https://otlp.arize.com/v1/traces"
        );
        assert!(settings.bot.app_id.is_empty());
    }

    #[test]
    fn env_overrides_defaults() {
        let mut settings = Settings::default();
        settings.apply_env(lookup_from(&[
            ("MicrosoftAppId", "app"),
            ("AZURE_SEARCH_INDEX", "docs"),
            ("AZURE_OPENAI_DEPLOYMENT", "gpt-4o"),
            ("PORT", "8080"),
            ("RAGBOT_SESSION_DB", "/tmp/sessions.db"),
        ]));

        assert_eq!(settings.bot.app_id, "app");
        assert_eq!(settings.search.index, "docs");
        assert_eq!(settings.openai.deployment, "gpt-4o");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(
            settings.memory.sqlite_path,
            Some(PathBuf::from("/tmp/sessions.db"))
        );
    }

    #[test]
    fn invalid_port_keeps_default() {
        let mut settings = Settings::default();
        settings.apply_env(lookup_from(&[("PORT", "not-a-port")]));
        assert_eq!(settings.server.port, 3978);
    }

    #[test]
    fn yaml_overlay_keeps_unspecified_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "search:\n  neighbors: 5\n  exhaustive: false\nopenai:\n  deployment: gpt-35\n",
        )
        .unwrap();

        let settings = load_yaml_file(&path).unwrap();
        assert_eq!(settings.search.neighbors, 5);
        assert!(!settings.search.exhaustive);
        assert_eq!(settings.search.vector_field, "contentVector");
        assert_eq!(settings.openai.deployment, "gpt-35");
        assert_eq!(settings.openai.api_version, "2024-02-15-preview");
    }

    #[test]
    fn malformed_yaml_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "search: [unterminated").unwrap();
        assert!(load_yaml_file(&path).is_err());
        assert!(load_yaml_file(&dir.path().join("missing.yml")).is_err());
    }

    #[test]
    fn load_reports_unusable_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "search: [unterminated").unwrap();
        let path = path.to_string_lossy().to_string();

        let (settings, warnings) =
            Settings::load_from(lookup_from(&[("RAGBOT_CONFIG_PATH", path.as_str())]));
        assert_eq!(settings.search.neighbors, 3);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Failed to parse config file"));

        let (_, warnings) = Settings::load_from(lookup_from(&[]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn odd_or_zero_window_falls_back_to_whole_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "memory:\n  history_window: 5\n").unwrap();
        let path = path.to_string_lossy().to_string();

        let (settings, warnings) =
            Settings::load_from(lookup_from(&[("RAGBOT_CONFIG_PATH", path.as_str())]));
        assert_eq!(settings.memory.history_window, 6);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("history_window"));

        let mut state = crate::history::SessionState::new("s");
        for n in 0..4 {
            state.record_turn(&format!("q{n}"), &format!("a{n}"), settings.memory.history_window);
        }
        assert_eq!(state.history[0].role, crate::history::Role::User);

        let mut zero = Settings::default();
        zero.memory.history_window = 0;
        assert_eq!(zero.validate().len(), 1);
        assert_eq!(zero.memory.history_window, 6);

        let mut four = Settings::default();
        four.memory.history_window = 4;
        assert!(four.validate().is_empty());
        assert_eq!(four.memory.history_window, 4);
    }

    #[test]
    fn redacted_masks_credentials_only() {
        let mut settings = Settings::default();
        settings.apply_env(lookup_from(&[
            ("MicrosoftAppPassword", "pw"),
            ("AZURE_SEARCH_KEY", "search-key"),
            ("AZURE_SEARCH_ENDPOINT", "https://search.example"),
        ]));

        let redacted = settings.redacted();
        assert_eq!(redacted["bot"]["app_password"], "****");
        assert_eq!(redacted["search"]["api_key"], "****");
        assert_eq!(redacted["search"]["endpoint"], "https://search.example");
        // unset secrets stay visibly empty
        assert_eq!(redacted["openai"]["api_key"], "");
    }
}

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::selection::bridge::DEFAULT_DEBOUNCE;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "bookchat";

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/chat";
pub const DEFAULT_GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_BACKEND_URL: &str = "BOOKCHAT_BACKEND_URL";
pub const ENV_API_KEY: &str = "BOOKCHAT_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// On-disk settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_endpoint")]
    pub endpoint_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// First bot message of a new conversation; `null` disables it
    #[serde(default = "default_greeting")]
    pub greeting: Option<String>,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

fn default_greeting() -> Option<String> {
    Some(DEFAULT_GREETING.to_string())
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            endpoint_url: default_endpoint(),
            api_key: String::new(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            debounce_ms: default_debounce_ms(),
            greeting: default_greeting(),
        }
    }
}

/// Resolved configuration handed to the chat widget and selection bridge
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub endpoint_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
    pub debounce: Duration,
    pub greeting: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Settings::default().into()
    }
}

impl From<Settings> for ChatConfig {
    fn from(settings: Settings) -> Self {
        Self {
            endpoint_url: settings.endpoint_url,
            api_key: settings.api_key,
            request_timeout: Duration::from_secs(settings.request_timeout_secs.max(1)),
            debounce: Duration::from_millis(settings.debounce_ms),
            greeting: settings.greeting,
        }
    }
}

/// Command-line overrides; `None` keeps the lower-precedence value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub debounce_ms: Option<u64>,
}

impl Settings {
    /// Environment values win over the file
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            debug!("Endpoint overridden by {ENV_BACKEND_URL}");
            self.endpoint_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            debug!("API key overridden by {ENV_API_KEY}");
            self.api_key = key;
        }
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.endpoint_url {
            self.endpoint_url = url.clone();
        }
        if let Some(key) = &overrides.api_key {
            self.api_key = key.clone();
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(ms) = overrides.debounce_ms {
            self.debounce_ms = ms;
        }
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Resolve the final configuration: CLI > environment > file > defaults.
///
/// An explicit `config_path` must exist and parse. Without one the default
/// location is used and created with defaults when missing.
pub fn resolve(config_path: Option<&Path>, overrides: &Overrides) -> Result<ChatConfig, ConfigError> {
    let mut settings = match config_path {
        Some(path) => load_settings_from_path(path)?,
        None => load_default_settings(),
    };
    settings.apply_env(|name| std::env::var(name).ok());
    settings.apply_overrides(overrides);
    info!("Chat endpoint: {}", settings.endpoint_url);
    Ok(settings.into())
}

fn load_default_settings() -> Settings {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return Settings::default();
    };

    if path.exists() {
        match load_settings_from_path(&path) {
            Ok(settings) => settings,
            Err(e) => {
                error!("{e}; using default settings");
                Settings::default()
            }
        }
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        save_settings_to_file(&settings, &path);
        settings
    }
}

pub fn load_settings_from_path(path: &Path) -> Result<Settings, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut settings: Settings =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Loaded settings from {path:?}");

    if settings.version < CURRENT_VERSION {
        migrate_settings(&mut settings);
        save_settings_to_file(&settings, path);
    }
    Ok(settings)
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    match fs::write(path, generate_settings_yaml(settings)) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::from(SETTINGS_HEADER);

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str(&format!("endpoint_url: {}\n", quoted(&settings.endpoint_url)));
    content.push_str(&format!("api_key: {}\n", quoted(&settings.api_key)));
    content.push_str(&format!(
        "request_timeout_secs: {}\n",
        settings.request_timeout_secs
    ));
    content.push_str(&format!("debounce_ms: {}\n", settings.debounce_ms));
    match &settings.greeting {
        Some(greeting) => content.push_str(&format!("greeting: {}\n", quoted(greeting))),
        None => content.push_str("greeting: null\n"),
    }

    content
}

/// Double-quoted scalar; JSON string escaping is valid YAML
fn quoted(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# bookchat settings
# ============================================================================
# endpoint_url and api_key can also be set with the BOOKCHAT_BACKEND_URL and
# BOOKCHAT_API_KEY environment variables; command-line flags win over both.

"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_local_backend() {
        let config = ChatConfig::default();
        assert_eq!(config.endpoint_url, "http://localhost:8000/chat");
        assert_eq!(config.api_key, "");
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.greeting.as_deref(), Some(DEFAULT_GREETING));
    }

    #[test]
    fn generated_yaml_round_trips() {
        let settings = Settings {
            api_key: "abc".into(),
            greeting: Some("Hi \"reader\"".into()),
            ..Settings::default()
        };
        let parsed: Settings = serde_yaml::from_str(&generate_settings_yaml(&settings)).unwrap();
        assert_eq!(parsed, settings);

        let silent = Settings {
            greeting: None,
            ..Settings::default()
        };
        let parsed: Settings = serde_yaml::from_str(&generate_settings_yaml(&silent)).unwrap();
        assert_eq!(parsed.greeting, None);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let settings: Settings = serde_yaml::from_str("api_key: \"k\"\n").unwrap();
        assert_eq!(settings.api_key, "k");
        assert_eq!(settings.endpoint_url, DEFAULT_ENDPOINT);
        assert_eq!(settings.debounce_ms, 300);
    }

    #[test]
    fn precedence_is_cli_then_env_then_file() {
        let mut settings = Settings {
            endpoint_url: "http://file/chat".into(),
            api_key: "file-key".into(),
            ..Settings::default()
        };
        let env: HashMap<&str, &str> = [
            (ENV_BACKEND_URL, "http://env/chat"),
            (ENV_API_KEY, "env-key"),
        ]
        .into_iter()
        .collect();
        settings.apply_env(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(settings.endpoint_url, "http://env/chat");
        assert_eq!(settings.api_key, "env-key");

        settings.apply_overrides(&Overrides {
            endpoint_url: Some("http://cli/chat".into()),
            ..Overrides::default()
        });
        assert_eq!(settings.endpoint_url, "http://cli/chat");
        assert_eq!(settings.api_key, "env-key");
    }

    #[test]
    fn blank_env_endpoint_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_env(|name| (name == ENV_BACKEND_URL).then(|| "  ".to_string()));
        assert_eq!(settings.endpoint_url, DEFAULT_ENDPOINT);
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 1\nendpoint_url: \"http://x/chat\"\ndebounce_ms: 50\n").unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.endpoint_url, "http://x/chat");
        assert_eq!(settings.debounce_ms, 50);
    }

    #[test]
    fn outdated_file_is_migrated_and_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 0\napi_key: \"old\"\n").unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.version, CURRENT_VERSION);
        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("version: 1"));
        assert!(rewritten.contains("api_key: \"old\""));
    }

    #[test]
    fn missing_or_broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            load_settings_from_path(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.yaml");
        fs::write(&broken, "debounce_ms: [not a number\n").unwrap();
        assert!(matches!(
            load_settings_from_path(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }
}

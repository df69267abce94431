//! Configuration loading, validation, and management for ChatRelay.
//!
//! Loads configuration from `~/.chatrelay/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.
//! The resulting [`AppConfig`] is immutable for the life of the process.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.chatrelay/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model backend name ("gemini", "groq", "openai", "anthropic", ...)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model used when a request doesn't name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature sent with every request
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

/// Hide the `user:password@` part of a connection URL.
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("provider", &self.provider)
            .field("storage", &self.storage)
            .field("chat", &self.chat)
            .field("gateway", &self.gateway)
            .field("logging", &self.logging)
            .finish()
    }
}

/// HTTP settings for the model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Override the backend's base URL (self-hosted or proxy endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Client-side timeout for one completion call
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_timeout() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// Which database holds the chat history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Postgres,
    Mysql,
    /// Ephemeral, process-local history (development and tests)
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Postgres => "postgres",
            StorageBackend::Mysql => "mysql",
            StorageBackend::Memory => "memory",
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// SQLite database file
    #[serde(default = "default_sqlite_path")]
    pub path: String,

    /// Connection URL for postgres / mysql
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// History table name
    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_sqlite_path() -> String {
    AppConfig::config_dir()
        .join("chat_history.db")
        .to_string_lossy()
        .into_owned()
}
fn default_table() -> String {
    "chat_history".into()
}
fn default_max_connections() -> u32 {
    5
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_sqlite_path(),
            url: None,
            table: default_table(),
            max_connections: default_max_connections(),
        }
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("path", &self.path)
            .field("url", &self.url.as_deref().map(redact_url))
            .field("table", &self.table)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// What to do when the exchange can't be written after the model answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppendFailurePolicy {
    /// Fail the request; history never misses an answered exchange.
    #[default]
    Fail,
    /// Log the failure and still return the answer.
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Number of past exchanges injected as context
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Keep only the last N characters of each past response in the context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_limit: Option<usize>,

    #[serde(default)]
    pub on_append_failure: AppendFailurePolicy,
}

fn default_history_limit() -> usize {
    5
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            output_limit: None,
            on_append_failure: AppendFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Whole-request deadline enforced at the HTTP boundary
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Allowed browser origins. Empty = any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            request_timeout_secs: default_request_timeout(),
            cors_origins: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,

    /// Also write daily-rolling log files into this directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Append every answered exchange to this JSONL file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<String>,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_file_prefix() -> String {
    "chatrelay.log".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
            file_prefix: default_file_prefix(),
            transcript_path: None,
        }
    }
}

/// Check that a name can be spliced into SQL as a bare table identifier.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    first_ok && name.len() <= 64 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl AppConfig {
    /// `CHATRELAY_CONFIG` when set, else ~/.chatrelay/config.toml.
    pub fn default_path() -> PathBuf {
        std::env::var("CHATRELAY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"))
    }

    /// Load configuration from the default path, then apply environment
    /// overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::default_path())
    }

    /// Load from a specific file, apply environment overrides, validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load_with_env`] with overrides read through
    /// `lookup`. Validation runs once, after the overrides.
    pub fn load_with(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Parse a specific file. A missing file yields the defaults.
    ///
    /// No validation happens here; environment overrides may still fill in
    /// required fields.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// API key precedence: config file, `CHATRELAY_API_KEY`, then the
    /// provider's conventional variable (`GOOGLE_API_KEY` for gemini, ...).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = lookup("CHATRELAY_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("CHATRELAY_MODEL") {
            self.default_model = model;
        }

        if self.api_key.is_none() {
            self.api_key = lookup("CHATRELAY_API_KEY").or_else(|| {
                provider_key_var(&self.default_provider).and_then(|var| lookup(var))
            });
        }

        if let Some(url) = lookup("CHATRELAY_DATABASE_URL") {
            self.storage.url = Some(url);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatrelay")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.chat.history_limit == 0 {
            return Err(ConfigError::ValidationError(
                "chat.history_limit must be at least 1".into(),
            ));
        }

        if !is_sql_identifier(&self.storage.table) {
            return Err(ConfigError::ValidationError(format!(
                "storage.table '{}' is not a valid SQL identifier",
                self.storage.table
            )));
        }

        if matches!(
            self.storage.backend,
            StorageBackend::Postgres | StorageBackend::Mysql
        ) && self.storage.url.is_none()
        {
            return Err(ConfigError::ValidationError(format!(
                "storage.url is required for the {} backend",
                self.storage.backend.as_str()
            )));
        }

        if self.gateway.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.request_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Render as TOML with secrets masked (for `chatrelay config`).
    pub fn redacted_toml(&self) -> String {
        let mut shown = self.clone();
        if shown.api_key.is_some() {
            shown.api_key = Some("[REDACTED]".into());
        }
        shown.storage.url = shown.storage.url.as_deref().map(redact_url);
        toml::to_string_pretty(&shown).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            provider: ProviderConfig::default(),
            storage: StorageConfig::default(),
            chat: ChatConfig::default(),
            gateway: GatewayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Conventional API key variable for well-known backends.
fn provider_key_var(provider: &str) -> Option<&'static str> {
    match provider {
        "gemini" | "google" => Some("GOOGLE_API_KEY"),
        "groq" => Some("GROQ_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        _ => None,
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

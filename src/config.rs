//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; an explicit empty list means permissive
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8085
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// LLM chat-completion provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`)
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Applies to connecting only; streamed bodies are not time-limited
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_provider_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Study backend (REST) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    #[serde(default = "default_backend_timeout")]
    pub request_timeout_ms: u64,

    /// Retry budget for idempotent reads; writes are never retried
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_backend_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_backend_timeout() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            request_timeout_ms: default_backend_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Assistant prompt configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Prepend the user's subjects and upcoming exams to the conversation
    #[serde(default = "default_include_context")]
    pub include_study_context: bool,

    #[serde(default = "default_max_history")]
    pub max_history_messages: usize,
}

fn default_system_prompt() -> String {
    "You are a friendly study assistant for students. Help them plan study \
     sessions and practice tasks around their exams. When the student asks you \
     to schedule something, call the matching tool once per item instead of \
     only describing it. Keep answers short and encouraging."
        .to_string()
}

fn default_include_context() -> bool {
    true
}

fn default_max_history() -> usize {
    20
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            include_study_context: default_include_context(),
            max_history_messages: default_max_history(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("studyhub").join("config.toml")),
            Some(PathBuf::from("/etc/studyhub/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = lookup("STUDYHUB_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("STUDYHUB_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Provider overrides
        if let Some(url) = lookup("STUDYHUB_PROVIDER_URL") {
            self.provider.base_url = url;
        }
        if let Some(key) = lookup("STUDYHUB_PROVIDER_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = lookup("STUDYHUB_MODEL") {
            self.provider.model = model;
        }

        // Backend overrides
        if let Some(url) = lookup("STUDYHUB_BACKEND_URL") {
            self.backend.base_url = url;
        }

        // Logging overrides
        if let Some(level) = lookup("STUDYHUB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("STUDYHUB_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# StudyHub Assistant Configuration
#
# Environment variables override these settings:
# - STUDYHUB_HOST
# - STUDYHUB_PORT
# - STUDYHUB_PROVIDER_URL
# - STUDYHUB_PROVIDER_API_KEY (falls back to OPENAI_API_KEY)
# - STUDYHUB_MODEL
# - STUDYHUB_BACKEND_URL
# - STUDYHUB_LOG_LEVEL
# - STUDYHUB_LOG_FORMAT

[server]
# Server host
host = "0.0.0.0"

# Server port
port = 8085

# Allowed CORS origins (empty list allows any origin)
cors_origins = ["http://localhost:3000", "http://127.0.0.1:3000"]

[provider]
# OpenAI-compatible API base URL
base_url = "https://api.openai.com/v1"

# API key (prefer the environment variable)
# api_key = ""

# Chat model
model = "gpt-4o-mini"

# Sampling temperature
temperature = 0.7

# Connect timeout in seconds
connect_timeout_secs = 10

[backend]
# Study backend REST API base URL
base_url = "http://localhost:8000/api"

# Request timeout in milliseconds
request_timeout_ms = 5000

# Retries for read requests (writes are never retried)
max_retries = 3

[assistant]
# Include the student's subjects and upcoming exams in the prompt
include_study_context = true

# Number of most recent chat messages forwarded to the model
max_history_messages = 20

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

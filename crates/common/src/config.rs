//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Language-model collaborator configuration.
    #[serde(default)]
    pub ai: AiConfig,
    /// Messaging configuration.
    #[serde(default)]
    pub messaging: MessagingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
    /// Shared secret a trusted identity provider presents to sync accounts.
    /// Identity sync is refused when unset.
    #[serde(default)]
    pub identity_sync_secret: Option<String>,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Local blob storage for uploaded listing images.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded files are written to.
    #[serde(default = "default_storage_path")]
    pub base_path: PathBuf,
    /// URL prefix the files are served under.
    #[serde(default = "default_storage_url")]
    pub base_url: String,
    /// Largest accepted upload in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_storage_path(),
            base_url: default_storage_url(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// OpenAI-compatible endpoint used for report summaries and recommendations.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// When false, the summarizer and recommender are never called.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the chat-completions API.
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    /// Bearer key for the API.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name.
    #[serde(default = "default_ai_model")]
    pub model: String,
    /// Per-request timeout.
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_ai_base_url(),
            api_key: None,
            model: default_ai_model(),
            timeout_secs: default_ai_timeout(),
        }
    }
}

/// Messaging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Attempts made to refresh a conversation preview after a send.
    #[serde(default = "default_preview_retries")]
    pub preview_retries: u32,
    /// Initial delay between preview attempts.
    #[serde(default = "default_preview_retry_delay_ms")]
    pub preview_retry_delay_ms: u64,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            preview_retries: default_preview_retries(),
            preview_retry_delay_ms: default_preview_retry_delay_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./files")
}

fn default_storage_url() -> String {
    "/files".to_string()
}

const fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_ai_timeout() -> u64 {
    20
}

const fn default_preview_retries() -> u32 {
    3
}

const fn default_preview_retry_delay_ms() -> u64 {
    50
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `RESOURCE_ENV`)
    /// 3. Environment variables with `RESOURCE__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("RESOURCE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("RESOURCE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("RESOURCE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration shared by both services.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the hosted agent framework.
    pub agent_api_url: String,
    /// API key for the model provider, forwarded as a bearer token.
    pub groq_api_key: String,
    /// Connection string the framework uses for conversation storage and the
    /// vector collection.
    pub database_url: String,
    /// Directory where uploaded PDFs are written.
    pub upload_dir: String,
    /// Base name for per-document knowledge collections.
    pub knowledge_collection: String,
    /// Model identifier used by the document agents.
    pub agent_model: String,
    /// Model identifier used by the legal chat agent.
    pub legal_model: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            agent_api_url: load_env("AGENT_API_URL")?,
            groq_api_key: load_env("GROQ_API_KEY")?,
            database_url: load_env("DATABASE_URL")?,
            upload_dir: load_env_optional("UPLOAD_DIR").unwrap_or_else(|| "uploads".into()),
            knowledge_collection: load_env_optional("KNOWLEDGE_COLLECTION")
                .unwrap_or_else(|| "pdf_chat".into()),
            agent_model: load_env_optional("AGENT_MODEL")
                .unwrap_or_else(|| "llama-3.1-8b-instant".into()),
            legal_model: load_env_optional("LEGAL_MODEL")
                .unwrap_or_else(|| "llama-3.2-1b-preview".into()),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        agent_api_url = %config.agent_api_url,
        upload_dir = %config.upload_dir,
        collection = %config.knowledge_collection,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

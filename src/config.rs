use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_LLM_MODEL: &str = "openai/gpt-oss-120b";
const DEFAULT_SERVER_PORT: u16 = 8000;
const DEFAULT_UPLOAD_DIR: &str = "data";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Configuration was initialized more than once.
    #[error("Configuration already initialized")]
    AlreadyInitialized,
}

/// Runtime configuration for the LedgerLens server.
#[derive(Clone)]
pub struct Config {
    /// Credential presented to the LLM provider as a bearer token.
    pub llm_api_key: String,
    /// Base URL of the OpenAI-compatible chat completions API.
    pub llm_base_url: String,
    /// Model identifier passed to the provider.
    pub llm_model: String,
    /// Sampling temperature for every role call.
    pub llm_temperature: f32,
    /// Upper bound on a single provider call.
    pub llm_timeout: Duration,
    /// Additional attempts allowed for transient provider failures.
    pub llm_max_retries: u32,
    /// Delay before the first retry; doubled for each subsequent retry.
    pub llm_retry_base_delay: Duration,
    /// Maximum number of document tokens embedded into each role prompt.
    pub document_token_budget: usize,
    /// Directory holding request-scoped uploads.
    pub upload_dir: PathBuf,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Port the HTTP server binds to.
    pub server_port: u16,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup, performing validation along the way.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let llm_api_key = optional("GROQ_API_KEY")
            .or_else(|| optional("LLM_API_KEY"))
            .ok_or_else(|| ConfigError::MissingVariable("GROQ_API_KEY".to_string()))?;

        let document_token_budget: usize = parse_or(
            optional("LLM_DOCUMENT_TOKEN_BUDGET"),
            "LLM_DOCUMENT_TOKEN_BUDGET",
            6000,
        )?;
        if document_token_budget == 0 {
            return Err(ConfigError::InvalidValue(
                "LLM_DOCUMENT_TOKEN_BUDGET".to_string(),
            ));
        }

        let timeout_secs: u64 = parse_or(optional("LLM_TIMEOUT_SECS"), "LLM_TIMEOUT_SECS", 60)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("LLM_TIMEOUT_SECS".to_string()));
        }

        Ok(Self {
            llm_api_key: llm_api_key.trim().to_string(),
            llm_base_url: optional("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            llm_model: optional("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_temperature: parse_or(optional("LLM_TEMPERATURE"), "LLM_TEMPERATURE", 0.2)?,
            llm_timeout: Duration::from_secs(timeout_secs),
            llm_max_retries: parse_or(optional("LLM_MAX_RETRIES"), "LLM_MAX_RETRIES", 2)?,
            llm_retry_base_delay: Duration::from_millis(parse_or(
                optional("LLM_RETRY_BASE_DELAY_MS"),
                "LLM_RETRY_BASE_DELAY_MS",
                500,
            )?),
            document_token_budget,
            upload_dir: optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_bytes: parse_or(
                optional("MAX_UPLOAD_BYTES"),
                "MAX_UPLOAD_BYTES",
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            server_port: parse_or(optional("SERVER_PORT"), "SERVER_PORT", DEFAULT_SERVER_PORT)?,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("llm_api_key", &"[REDACTED]")
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .field("llm_temperature", &self.llm_temperature)
            .field("llm_timeout", &self.llm_timeout)
            .field("llm_max_retries", &self.llm_max_retries)
            .field("llm_retry_base_delay", &self.llm_retry_base_delay)
            .field("document_token_budget", &self.document_token_budget)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("server_port", &self.server_port)
            .finish()
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, ConfigError> {
    value
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|parsed| parsed.unwrap_or(default))
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment (and `.env`) and install it in the global cache.
///
/// A missing provider credential is fatal: callers are expected to abort startup on error.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        llm_base_url = %config.llm_base_url,
        llm_model = %config.llm_model,
        server_port = config.server_port,
        upload_dir = %config.upload_dir.display(),
        "Loaded configuration"
    );
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    Ok(get_config())
}

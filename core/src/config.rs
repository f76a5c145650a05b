use crate::error::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

pub const OPENAI_API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// Settings for the chat-completions oracle.
///
/// The API key is never part of this struct; it is read from the
/// environment variable named by `api_key_env`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Base URL of the OpenAI-compatible API, without the trailing path.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Kept low: the answer is a single identifier, not prose.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Pause before every oracle call so that a burst of distinct misses
    /// does not hit the service all at once.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// HTTP timeout for a single call. Unset means no timeout is imposed
    /// here and the caller bounds the whole operation instead.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_max_tokens() -> u32 {
    500
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_api_key_env() -> String {
    OPENAI_API_KEY_ENV_VAR.to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            settle_delay_ms: default_settle_delay_ms(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: None,
        }
    }
}

impl OracleConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be in [0.0, 2.0], got {}",
                self.temperature
            ));
        }

        if self.max_tokens == 0 {
            return Err("max_tokens must be > 0".to_string());
        }

        if self.api_key_env.trim().is_empty() {
            return Err("api_key_env must not be empty".to_string());
        }

        Ok(())
    }
}

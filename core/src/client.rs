use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::oracle::Oracle;
use crate::oracle::SYSTEM_PROMPT;
use crate::oracle::parse_answer;
use crate::oracle::user_prompt;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio::time::sleep;
use tracing::debug;

/// [`Oracle`] backed by an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct ChatOracle {
    config: OracleConfig,
    api_key: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for ChatOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOracle")
            .field("config", &self.config)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ChatOracle {
    pub fn new(config: OracleConfig, api_key: impl Into<String>) -> Result<Self, OracleError> {
        config
            .validate()
            .map_err(|reason| OracleError::Unavailable { reason })?;

        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(OracleError::Unavailable {
                reason: "API key is empty".to_string(),
            });
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|err| OracleError::Unavailable {
            reason: format!("failed to build HTTP client: {err}"),
        })?;

        Ok(Self {
            config,
            api_key,
            http,
        })
    }

    /// Reads the API key from the variable named by `config.api_key_env`.
    ///
    /// A missing or blank key is [`OracleError::Unavailable`]; the harness
    /// should stop rather than run without self-healing.
    pub fn from_env(config: OracleConfig) -> Result<Self, OracleError> {
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Self::new(config, key),
            _ => Err(OracleError::Unavailable {
                reason: format!("{} is not set", config.api_key_env),
            }),
        }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Oracle for ChatOracle {
    async fn query(&self, stale_id: &str, snapshot: &str) -> Result<String, OracleError> {
        let delay = self.config.settle_delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }

        let prompt = user_prompt(stale_id, snapshot);
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(stale_id, model = %self.config.model, "querying oracle");
        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::CallFailed(format!("{status} - {body}")));
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|err| OracleError::CallFailed(format!("malformed response: {err}")))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                OracleError::CallFailed("response carried no message content".to_string())
            })?;
        parse_answer(&content)
    }
}

//! Chat-completions oracle provider.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::contract::{BossTurnOutcome, BossTurnRequest, Oracle, PlayerTurnOutcome, PlayerTurnRequest};
use crate::error::OracleError;
use crate::models::{ChatMessage, ChatRequest, ChatResponse};
use crate::prompt::{boss_turn_messages, player_turn_messages};
use crate::validation::{parse_boss_turn, parse_player_turn};

/// Default endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// Connection settings for [`ChatCompletionOracle`].
#[derive(Debug, Clone)]
pub struct OracleSettings {
    /// Endpoint root, e.g. `https://api.groq.com/openai/v1`.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model name.
    pub model: String,
}

impl OracleSettings {
    /// Settings for the default endpoint and model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_owned(),
        }
    }
}

/// Oracle backed by an OpenAI-compatible `chat/completions` endpoint in
/// JSON mode.
#[derive(Clone)]
pub struct ChatCompletionOracle {
    client: reqwest::Client,
    settings: OracleSettings,
}

impl std::fmt::Debug for ChatCompletionOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionOracle")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionOracle {
    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::Unavailable` if the API key is blank, or
    /// `OracleError::Request` if the HTTP client cannot be built.
    pub fn new(settings: OracleSettings) -> Result<Self, OracleError> {
        if settings.api_key.trim().is_empty() {
            return Err(OracleError::Unavailable("api key is blank".to_owned()));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { client, settings })
    }

    /// Endpoint root.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    /// Sends one JSON-mode completion and returns the message content.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));
        let request = ChatRequest::json_mode(&self.settings.model, messages);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatResponse = response.json().await?;
        debug!(model = %completion.model, choices = completion.choices.len(), "completion received");
        completion
            .content()
            .map(str::to_owned)
            .ok_or(OracleError::EmptyResponse)
    }
}

#[async_trait]
impl Oracle for ChatCompletionOracle {
    #[instrument(skip(self, request), fields(actions = request.actions.len()))]
    async fn resolve_player_turn(
        &self,
        request: &PlayerTurnRequest,
    ) -> Result<PlayerTurnOutcome, OracleError> {
        let content = self.complete(player_turn_messages(request)?).await?;
        parse_player_turn(&content)
    }

    #[instrument(skip(self, request), fields(targets = request.targets.len()))]
    async fn resolve_boss_turn(
        &self,
        request: &BossTurnRequest,
    ) -> Result<BossTurnOutcome, OracleError> {
        let content = self.complete(boss_turn_messages(request)?).await?;
        parse_boss_turn(&content)
    }
}

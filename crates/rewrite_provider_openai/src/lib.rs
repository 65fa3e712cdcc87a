//! OpenAI chat-completions implementation of the `rewrite_provider` contract.
//!
//! This adapter turns a [`RewriteRequest`] into a system + user chat turn,
//! drives `rewrite_api` on a private current-thread runtime, and folds the
//! transport error space into [`RewriteError`].

use std::sync::Arc;
use std::time::Duration;

use rewrite_api::{
    ChatCompletionRequest, ChatMessage, RewriteApiClient, RewriteApiConfig, RewriteApiError,
};
use rewrite_provider::{CancelSignal, ProviderProfile, RewriteError, RewriteProvider, RewriteRequest};
use tracing::debug;

/// Stable provider identifier.
pub const OPENAI_PROVIDER_ID: &str = "openai";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 1200;

/// Runtime configuration for the OpenAI rewrite provider.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiRewriteProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
}

impl OpenAiRewriteProviderConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: None,
            max_retries: None,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    fn api_config(&self) -> RewriteApiConfig {
        let mut config = RewriteApiConfig::new(self.api_key.clone());
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(max_retries) = self.max_retries {
            config = config.with_max_retries(max_retries);
        }
        config
    }
}

trait CompletionClient: Send + Sync {
    fn complete_text(
        &self,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
    ) -> Result<String, RewriteApiError>;
}

#[derive(Debug)]
struct DefaultCompletionClient {
    client: RewriteApiClient,
}

impl CompletionClient for DefaultCompletionClient {
    fn complete_text(
        &self,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
    ) -> Result<String, RewriteApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                RewriteApiError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(self.client.complete_text(request, Some(cancel)))
    }
}

/// `RewriteProvider` adapter backed by `rewrite_api`.
pub struct OpenAiRewriteProvider {
    model: String,
    temperature: f64,
    max_tokens: u32,
    client: Arc<dyn CompletionClient>,
}

impl OpenAiRewriteProvider {
    pub fn new(config: OpenAiRewriteProviderConfig) -> Result<Self, RewriteError> {
        if config.api_key.trim().is_empty() {
            return Err(RewriteError::Init(
                "OpenAI API key is empty; set it in the environment".to_string(),
            ));
        }
        let client = RewriteApiClient::new(config.api_config()).map_err(|error| {
            RewriteError::Init(format!("failed to initialize {OPENAI_PROVIDER_ID} provider: {error}"))
        })?;

        Ok(Self {
            model: sanitize_model(&config.model),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: Arc::new(DefaultCompletionClient { client }),
        })
    }

    fn completion_request(&self, request: &RewriteRequest) -> ChatCompletionRequest {
        ChatCompletionRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(request.system_instructions.clone()),
                ChatMessage::user(request.user_prompt()),
            ],
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens)
    }

    #[cfg(test)]
    fn with_client_for_tests(model: &str, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            model: sanitize_model(model),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            client,
        }
    }
}

impl RewriteProvider for OpenAiRewriteProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: OPENAI_PROVIDER_ID.to_string(),
            model_id: self.model.clone(),
        }
    }

    fn rewrite(
        &self,
        request: &RewriteRequest,
        cancel: &CancelSignal,
    ) -> Result<String, RewriteError> {
        let completion = self.completion_request(request);
        debug!(
            model = %self.model,
            document_chars = request.document.chars().count(),
            "requesting rewrite"
        );
        self.client
            .complete_text(&completion, cancel)
            .map_err(map_api_error)
    }
}

fn sanitize_model(model: &str) -> String {
    let model = model.trim();
    if model.is_empty() {
        DEFAULT_MODEL.to_string()
    } else {
        model.to_string()
    }
}

fn map_api_error(error: RewriteApiError) -> RewriteError {
    match error {
        RewriteApiError::Cancelled => RewriteError::Cancelled,
        RewriteApiError::EmptyCompletion { .. } => RewriteError::EmptyResponse {
            provider_id: OPENAI_PROVIDER_ID.to_string(),
        },
        RewriteApiError::MissingApiKey
        | RewriteApiError::MissingModel
        | RewriteApiError::InvalidHeader(_) => RewriteError::Init(error.to_string()),
        other => RewriteError::Service {
            provider_id: OPENAI_PROVIDER_ID.to_string(),
            message: other.to_string(),
            attempts: other.attempts(),
        },
    }
}

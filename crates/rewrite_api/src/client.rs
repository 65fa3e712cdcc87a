use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};

use crate::config::RewriteApiConfig;
use crate::error::{is_quota_exhausted, parse_error_message, RewriteApiError};
use crate::payload::{ChatCompletionRequest, ChatCompletionResponse};
use crate::retry::{is_retryable_http_error, retry_delay_ms};
use crate::url::normalize_completions_url;

/// Optional cancellation signal shared across request and backoff waits.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);
const DEFAULT_USER_AGENT: &str = concat!("mom_relay/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct RewriteApiClient {
    http: Client,
    config: RewriteApiConfig,
    backoff: fn(u32) -> Duration,
}

impl RewriteApiClient {
    pub fn new(config: RewriteApiConfig) -> Result<Self, RewriteApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(RewriteApiError::from)?;
        Ok(Self {
            http,
            config,
            backoff: retry_delay_ms,
        })
    }

    /// Replaces the retry backoff schedule.
    pub fn with_backoff(mut self, backoff: fn(u32) -> Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn config(&self) -> &RewriteApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_completions_url(&self.config.base_url)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, RewriteApiError> {
        let api_key = self.config.api_key.trim();
        if api_key.is_empty() {
            return Err(RewriteApiError::MissingApiKey);
        }

        let mut headers = vec![
            ("authorization".to_owned(), format!("Bearer {api_key}")),
            ("content-type".to_owned(), "application/json".to_owned()),
            ("accept".to_owned(), "application/json".to_owned()),
            (
                "user-agent".to_owned(),
                self.config
                    .user_agent
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .unwrap_or(DEFAULT_USER_AGENT)
                    .to_owned(),
            ),
        ];
        if let Some(organization) = self
            .config
            .organization
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            headers.push(("openai-organization".to_owned(), organization.to_owned()));
        }
        for (key, value) in &self.config.extra_headers {
            headers.push((key.trim().to_ascii_lowercase(), value.trim().to_owned()));
        }

        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| RewriteApiError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| RewriteApiError::InvalidHeader(format!("invalid value for {key}")))?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<reqwest::RequestBuilder, RewriteApiError> {
        if request.model.trim().is_empty() {
            return Err(RewriteApiError::MissingModel);
        }

        let headers = self.build_headers()?;
        let mut payload = request.clone();
        payload.stream = false;
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(&payload))
    }

    pub async fn send_with_retry(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, RewriteApiError> {
        let max_retries = self.config.max_retries;
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;
        let mut attempts = 0;

        for attempt in 0..=max_retries {
            if is_cancelled(cancellation) {
                return Err(RewriteApiError::Cancelled);
            }
            attempts = attempt + 1;

            let response = self.build_request(request)?.send();
            let response = await_or_cancel(response, cancellation).await?;

            match response {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    last_status = Some(status);
                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_default();
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if is_quota_exhausted(&body) {
                        return Err(RewriteApiError::QuotaExhausted { message });
                    }
                    if !is_retryable_http_error(status.as_u16(), &body) {
                        return Err(RewriteApiError::Status(status, message));
                    }
                }
                Err(error) => {
                    last_error = Some(error.to_string());
                }
            }

            if attempt < max_retries {
                await_or_cancel(tokio::time::sleep((self.backoff)(attempt)), cancellation).await?;
            }
        }

        Err(RewriteApiError::RetryExhausted {
            attempts,
            status: last_status,
            last_error,
        })
    }

    /// Sends `request` and returns the parsed response body.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ChatCompletionResponse, RewriteApiError> {
        let response = self.send_with_retry(request, cancellation).await?;
        let body = await_or_cancel(response.text(), cancellation).await??;
        Ok(serde_json::from_str(&body)?)
    }

    /// Sends `request` and returns the trimmed text of the first choice.
    pub async fn complete_text(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<String, RewriteApiError> {
        let response = self.complete(request, cancellation).await?;
        match response.first_text() {
            Some(text) => Ok(text.to_owned()),
            None => Err(RewriteApiError::EmptyCompletion {
                finish_reason: response.first_finish_reason().map(str::to_owned),
            }),
        }
    }
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, RewriteApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(RewriteApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(RewriteApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ChatMessage;

    #[test]
    fn build_request_forces_non_streaming_json() {
        let client = RewriteApiClient::new(RewriteApiConfig::new("sk-test")).expect("client");
        let mut request = ChatCompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")]);
        request.stream = true;

        let built = client
            .build_request(&request)
            .expect("builder")
            .build()
            .expect("request");
        let body = built
            .body()
            .and_then(|body| body.as_bytes())
            .expect("json body is buffered");
        let json: serde_json::Value = serde_json::from_slice(body).expect("json");

        assert_eq!(json["stream"], false);
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn build_request_requires_model() {
        let client = RewriteApiClient::new(RewriteApiConfig::new("sk-test")).expect("client");
        let request = ChatCompletionRequest::new(" ", Vec::new());
        assert!(matches!(
            client.build_request(&request),
            Err(RewriteApiError::MissingModel)
        ));
    }

    #[test]
    fn cancelled_signal_is_observed() {
        let token: CancellationSignal = Arc::new(AtomicBool::new(true));
        assert!(is_cancelled(Some(&token)));
        assert!(!is_cancelled(None));
    }
}

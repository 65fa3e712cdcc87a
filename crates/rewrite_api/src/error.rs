use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum RewriteApiError {
    MissingApiKey,
    MissingModel,
    InvalidHeader(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
    EmptyCompletion {
        finish_reason: Option<String>,
    },
    QuotaExhausted {
        message: String,
    },
    RetryExhausted {
        attempts: u32,
        status: Option<StatusCode>,
        last_error: Option<String>,
    },
    Cancelled,
    Unknown(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(rename = "error")]
    pub value: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
    pub code: Option<serde_json::Value>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

impl ErrorPayloadFields {
    fn code_str(&self) -> Option<&str> {
        self.code.as_ref().and_then(serde_json::Value::as_str)
    }

    fn is_quota_exhausted(&self) -> bool {
        [self.code_str(), self.type_.as_deref()]
            .into_iter()
            .flatten()
            .any(|code| code.eq_ignore_ascii_case("insufficient_quota"))
    }
}

impl fmt::Display for RewriteApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "API key is required"),
            Self::MissingModel => write!(f, "model id is required"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::EmptyCompletion { finish_reason } => match finish_reason {
                Some(reason) => write!(f, "completion was empty (finish_reason: {reason})"),
                None => write!(f, "completion was empty"),
            },
            Self::QuotaExhausted { message } => write!(f, "quota exhausted: {message}"),
            Self::RetryExhausted {
                attempts,
                status,
                last_error,
            } => {
                let status = status
                    .map(|status| status.as_u16().to_string())
                    .unwrap_or_else(|| "n/a".to_owned());
                write!(
                    f,
                    "retry exhausted after {attempts} attempts (status: {status}, last_error: {last_error:?})"
                )
            }
            Self::Cancelled => write!(f, "request was cancelled"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for RewriteApiError {}

impl From<reqwest::Error> for RewriteApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for RewriteApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

impl RewriteApiError {
    /// Number of HTTP attempts behind this error, when known.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::RetryExhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}

pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        if body.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.to_string()
        }
    };

    match serde_json::from_str::<ErrorPayload>(body) {
        Ok(ErrorPayload { value: Some(error) }) => error
            .message
            .as_deref()
            .filter(|message| !message.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(fallback),
        _ => fallback(),
    }
}

/// True when the body reports an exhausted billing quota, which no retry fixes.
pub fn is_quota_exhausted(body: &str) -> bool {
    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.value)
        .is_some_and(|error| error.is_quota_exhausted())
}

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

/// W3C error code returned when a lookup matches nothing.
pub const NO_SUCH_ELEMENT: &str = "no such element";
/// W3C error code returned for an element detached from the DOM.
pub const STALE_ELEMENT_REFERENCE: &str = "stale element reference";

#[derive(Debug)]
pub enum WebDriverError {
    InvalidEndpoint(String),
    Request(reqwest::Error),
    Serde(JsonError),
    /// The remote end answered with a W3C error object.
    Protocol {
        status: StatusCode,
        error: String,
        message: String,
    },
    UnexpectedResponse(String),
    Timeout {
        what: String,
        waited: Duration,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    value: Option<ErrorValue>,
}

#[derive(Debug, Deserialize)]
struct ErrorValue {
    error: Option<String>,
    message: Option<String>,
}

impl WebDriverError {
    /// Builds a protocol error from a non-success response body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let (error, message) = parse_error_body(status, body);
        Self::Protocol {
            status,
            error,
            message,
        }
    }

    /// W3C error code, when the remote end supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Protocol { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_no_such_element(&self) -> bool {
        self.code() == Some(NO_SUCH_ELEMENT)
    }

    pub fn is_stale_element(&self) -> bool {
        self.code() == Some(STALE_ELEMENT_REFERENCE)
    }
}

impl fmt::Display for WebDriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEndpoint(message) => write!(f, "invalid WebDriver endpoint: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::Protocol {
                status,
                error,
                message,
            } => write!(f, "WebDriver {error} (HTTP {}): {message}", status.as_u16()),
            Self::UnexpectedResponse(message) => write!(f, "unexpected response: {message}"),
            Self::Timeout { what, waited } => {
                write!(f, "timed out after {}ms waiting for {what}", waited.as_millis())
            }
        }
    }
}

impl std::error::Error for WebDriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Serde(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for WebDriverError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for WebDriverError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Splits a W3C error body into `(error code, message)`.
pub fn parse_error_body(status: StatusCode, body: &str) -> (String, String) {
    let fallback_message = || {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.to_string()
        }
    };

    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { value: Some(value) }) => (
            value.error.unwrap_or_else(|| "unknown error".to_string()),
            value
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(fallback_message),
        ),
        _ => ("unknown error".to_string(), fallback_message()),
    }
}

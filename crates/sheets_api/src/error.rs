use std::fmt;
use std::path::PathBuf;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum SheetsApiError {
    MissingCredentials,
    MissingSpreadsheetId,
    InvalidBaseUrl(String),
    /// A token, key or key file that cannot be used as given.
    InvalidCredentials(String),
    /// The OAuth token endpoint refused the service-account grant.
    TokenExchange(StatusCode, String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayloadFields {
    message: Option<String>,
    status: Option<String>,
}

impl fmt::Display for SheetsApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials => {
                write!(f, "an access token or API key is required to read the sheet")
            }
            Self::MissingSpreadsheetId => write!(f, "spreadsheet id is required"),
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::InvalidCredentials(message) => write!(f, "invalid credentials: {message}"),
            Self::TokenExchange(status, message) => {
                write!(f, "service account token exchange failed: HTTP {status} {message}")
            }
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Serde(error) => write!(f, "malformed grid payload: {error}"),
            Self::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SheetsApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Serde(error) => Some(error),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SheetsApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for SheetsApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Extracts a readable message from a Google API error body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.to_string()
        }
    };

    let Ok(parsed) = serde_json::from_str::<ErrorPayload>(body) else {
        return fallback();
    };
    let Some(error) = parsed.error else {
        return fallback();
    };

    match (error.status.as_deref(), error.message.as_deref()) {
        (Some(code), Some(message)) if !code.is_empty() && !message.is_empty() => {
            format!("{code}: {message}")
        }
        (_, Some(message)) if !message.is_empty() => message.to_string(),
        _ => fallback(),
    }
}

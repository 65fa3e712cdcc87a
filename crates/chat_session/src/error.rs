use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why a delivery session ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatFailure {
    #[error("interactive login did not complete within {}s", .waited.as_secs())]
    AuthTimeout { waited: Duration },

    #[error("stored session at {path} is no longer accepted; log in again")]
    StaleSession { path: PathBuf },

    #[error(
        "no conversation titled '{name}' and no case-insensitive match among {seen} visible entries"
    )]
    ConversationNotFound { name: String, seen: usize },

    #[error("message input not found; tried {}", .selectors.join(", "))]
    InputNotFound { selectors: Vec<String> },

    #[error("sending chunk {} of {total} failed ({sent} already delivered): {message}", .index + 1)]
    SendError {
        index: usize,
        sent: usize,
        total: usize,
        message: String,
    },

    #[error("delivery cancelled after {sent} of {total} chunks")]
    Cancelled { sent: usize, total: usize },

    #[error("browser could not be started: {message}")]
    Launch { message: String },

    #[error("chat client error while {stage}: {message}")]
    Ui { stage: &'static str, message: String },

    #[error("session store error: {message}")]
    Store { message: String },

    #[error("event '{event}' is not valid in state '{state}'")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

/// Failure reported by a [`crate::ChatUi`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UiError {
    pub message: String,
}

impl UiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<webdriver_api::WebDriverError> for UiError {
    fn from(error: webdriver_api::WebDriverError) -> Self {
        Self::new(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse session state at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("session state at {path} has unsupported version {found}; expected {expected}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("failed to serialize session state for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    ClockFormat(#[source] time::error::Format),
}

impl StoreError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// True when the file exists but cannot be used as a session state.
    #[must_use]
    pub fn is_unreadable_state(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::UnsupportedVersion { .. })
    }
}

impl From<StoreError> for ChatFailure {
    fn from(error: StoreError) -> Self {
        Self::Store {
            message: error.to_string(),
        }
    }
}

use std::fmt;
use std::path::{Path, PathBuf};

use chat_session::ChatFailure;
use mom_relay::EmptySourceError;
use rewrite_provider::RewriteError;
use sheets_api::SheetsApiError;
use thiserror::Error;

use crate::artifact::ArtifactError;
use crate::config::ConfigError;

/// Pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Setup,
    Fetch,
    Flatten,
    Rewrite,
    Persist,
    Deliver,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Setup => "setup",
            Self::Fetch => "fetch",
            Self::Flatten => "flatten",
            Self::Rewrite => "rewrite",
            Self::Persist => "persist",
            Self::Deliver => "deliver",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to set up {what}: {message}")]
    Setup { what: &'static str, message: String },

    #[error("failed to read rows from {source_name}: {error}")]
    Fetch {
        source_name: String,
        #[source]
        error: SheetsApiError,
    },

    #[error(transparent)]
    Flatten(#[from] EmptySourceError),

    #[error("{error}{}", raw_hint(.raw_artifact.as_deref()))]
    Rewrite {
        #[source]
        error: RewriteError,
        /// Flattened source saved before the error propagated.
        raw_artifact: Option<PathBuf>,
    },

    #[error(transparent)]
    Persist(#[from] ArtifactError),

    #[error("delivery failed after {sent} of {total} chunks: {failure}; content kept at {}", .artifact.display())]
    Deliver {
        #[source]
        failure: ChatFailure,
        sent: usize,
        total: usize,
        artifact: PathBuf,
    },
}

impl RelayError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Config(_) => Stage::Config,
            Self::Setup { .. } => Stage::Setup,
            Self::Fetch { .. } => Stage::Fetch,
            Self::Flatten(_) => Stage::Flatten,
            Self::Rewrite { .. } => Stage::Rewrite,
            Self::Persist(_) => Stage::Persist,
            Self::Deliver { .. } => Stage::Deliver,
        }
    }

    pub fn setup(what: &'static str, message: impl fmt::Display) -> Self {
        Self::Setup {
            what,
            message: message.to_string(),
        }
    }

    /// True when the run stopped because the cancel flag was raised.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Rewrite {
                error: RewriteError::Cancelled,
                ..
            } | Self::Deliver {
                failure: ChatFailure::Cancelled { .. },
                ..
            }
        )
    }
}

fn raw_hint(raw_artifact: Option<&Path>) -> String {
    match raw_artifact {
        Some(path) => format!("; raw notes saved to {}", path.display()),
        None => String::new(),
    }
}

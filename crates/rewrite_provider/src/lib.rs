//! Minimal provider-agnostic contract for rewriting a markdown document.
//!
//! This crate defines the request/response types and the [`RewriteProvider`]
//! trait shared by the language-model adapter, the scripted test double, and
//! the passthrough provider. It excludes transport details entirely.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag.
pub type CancelSignal = Arc<AtomicBool>;

/// System prompt asking for minutes-of-meeting structure with emphasis kept.
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "You are a helpful assistant. Rephrase the \
following meeting notes into a concise, professional Minutes of Meeting format. Keep any \
markdown-style bold/italic markers intact.";

/// Layout request appended after the raw notes.
pub const DEFAULT_LAYOUT_INSTRUCTIONS: &str = "Rewrite as: Title, Summary, Key Points \
(bulleted), Action Items (bulleted). Preserve markdown formatting.";

/// Input for one rewrite call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRequest {
    pub document: String,
    pub system_instructions: String,
    pub layout_instructions: String,
}

impl RewriteRequest {
    /// Creates a request with the default minutes-of-meeting instructions.
    #[must_use]
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
            layout_instructions: DEFAULT_LAYOUT_INSTRUCTIONS.to_string(),
        }
    }

    #[must_use]
    pub fn with_system_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.system_instructions = instructions.into();
        self
    }

    #[must_use]
    pub fn with_layout_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.layout_instructions = instructions.into();
        self
    }

    /// User-turn text sent to chat-style models.
    #[must_use]
    pub fn user_prompt(&self) -> String {
        format!(
            "Raw notes:\n{}\n\n{}",
            self.document, self.layout_instructions
        )
    }
}

/// Why a rewrite failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    /// The provider could not be constructed or configured.
    Init(String),
    /// The service answered, but with no usable text.
    EmptyResponse { provider_id: String },
    /// The service call failed.
    Service {
        provider_id: String,
        message: String,
        attempts: u32,
    },
    Cancelled,
}

impl RewriteError {
    #[must_use]
    pub fn service(provider_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            provider_id: provider_id.into(),
            message: message.into(),
            attempts: 1,
        }
    }
}

impl fmt::Display for RewriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(message) => write!(f, "rewrite provider init failed: {message}"),
            Self::EmptyResponse { provider_id } => {
                write!(f, "rewrite provider '{provider_id}' returned an empty response")
            }
            Self::Service {
                provider_id,
                message,
                attempts,
            } => write!(
                f,
                "rewrite provider '{provider_id}' failed after {attempts} attempt(s): {message}"
            ),
            Self::Cancelled => write!(f, "rewrite was cancelled"),
        }
    }
}

impl std::error::Error for RewriteError {}

/// Immutable metadata describing a rewrite provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_id: String,
}

/// Text-in/text-out rewrite service.
pub trait RewriteProvider: Send + Sync {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Rewrites the request document.
    ///
    /// Implementations must not return whitespace-only text; they report
    /// [`RewriteError::EmptyResponse`] instead.
    fn rewrite(&self, request: &RewriteRequest, cancel: &CancelSignal)
        -> Result<String, RewriteError>;
}

/// Stable identifier of [`PassthroughProvider`].
pub const PASSTHROUGH_PROVIDER_ID: &str = "passthrough";

/// Returns the document unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughProvider;

impl RewriteProvider for PassthroughProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: PASSTHROUGH_PROVIDER_ID.to_string(),
            model_id: "identity".to_string(),
        }
    }

    fn rewrite(
        &self,
        request: &RewriteRequest,
        cancel: &CancelSignal,
    ) -> Result<String, RewriteError> {
        if is_cancelled(cancel) {
            return Err(RewriteError::Cancelled);
        }
        if request.document.trim().is_empty() {
            return Err(RewriteError::EmptyResponse {
                provider_id: PASSTHROUGH_PROVIDER_ID.to_string(),
            });
        }
        Ok(request.document.clone())
    }
}

/// Returns true once `cancel` has been raised.
#[must_use]
pub fn is_cancelled(cancel: &CancelSignal) -> bool {
    cancel.load(Ordering::Acquire)
}

/// Creates a fresh, unraised cancellation flag.
#[must_use]
pub fn cancel_signal() -> CancelSignal {
    Arc::new(AtomicBool::new(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_to_minutes_instructions() {
        let request = RewriteRequest::new("**notes**");
        assert_eq!(request.system_instructions, DEFAULT_SYSTEM_INSTRUCTIONS);
        assert!(request.user_prompt().starts_with("Raw notes:\n**notes**\n\n"));
        assert!(request.user_prompt().ends_with("Preserve markdown formatting."));
    }

    #[test]
    fn request_instructions_can_be_overridden() {
        let request = RewriteRequest::new("x")
            .with_system_instructions("sys")
            .with_layout_instructions("layout");
        assert_eq!(request.system_instructions, "sys");
        assert_eq!(request.user_prompt(), "Raw notes:\nx\n\nlayout");
    }

    #[test]
    fn passthrough_returns_document_verbatim() {
        let provider = PassthroughProvider;
        let output = provider
            .rewrite(&RewriteRequest::new("*keep* me"), &cancel_signal())
            .expect("passthrough succeeds");
        assert_eq!(output, "*keep* me");
        assert_eq!(provider.profile().provider_id, PASSTHROUGH_PROVIDER_ID);
    }

    #[test]
    fn passthrough_honours_cancellation_and_empty_input() {
        let cancel = cancel_signal();
        cancel.store(true, Ordering::Release);
        assert_eq!(
            PassthroughProvider.rewrite(&RewriteRequest::new("x"), &cancel),
            Err(RewriteError::Cancelled)
        );
        assert!(matches!(
            PassthroughProvider.rewrite(&RewriteRequest::new("  "), &cancel_signal()),
            Err(RewriteError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn service_error_display_names_provider_and_attempts() {
        let error = RewriteError::Service {
            provider_id: "openai".to_string(),
            message: "HTTP 503".to_string(),
            attempts: 4,
        };
        assert_eq!(
            error.to_string(),
            "rewrite provider 'openai' failed after 4 attempt(s): HTTP 503"
        );
    }
}

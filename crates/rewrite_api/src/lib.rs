//! Transport-only client for OpenAI-compatible chat-completions endpoints.
//!
//! This crate owns request building, bounded retry of transient failures, and
//! response/error decoding. It knows nothing about meeting notes or chat
//! delivery; the `rewrite_provider_openai` adapter maps it onto the
//! `rewrite_provider` contract.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod retry;
pub mod url;

pub use client::{CancellationSignal, RewriteApiClient};
pub use config::RewriteApiConfig;
pub use error::RewriteApiError;
pub use payload::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
pub use url::normalize_completions_url;

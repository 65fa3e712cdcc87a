//! Deterministic scripted implementation of the `rewrite_provider` contract.
//!
//! This crate contains no transport logic and is intended for dry runs and
//! contract-level pipeline tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use rewrite_provider::{
    is_cancelled, CancelSignal, ProviderProfile, RewriteError, RewriteProvider, RewriteRequest,
};

/// Stable provider identifier.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Return this text.
    Text(String),
    /// Return the request document with a prefix and suffix.
    Wrap { prefix: String, suffix: String },
    /// Fail with this error.
    Fail(RewriteError),
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<ScriptedReply>,
    requests: Vec<RewriteRequest>,
}

/// Replays queued replies in order and records every request.
///
/// When the queue is exhausted the document is echoed back unchanged.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    state: Mutex<ScriptState>,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                replies: replies.into(),
                requests: Vec::new(),
            }),
        }
    }

    /// A provider whose first reply is `text`.
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(vec![ScriptedReply::Text(text.into())])
    }

    /// A provider whose first call fails with `error`.
    #[must_use]
    pub fn failing(error: RewriteError) -> Self {
        Self::new(vec![ScriptedReply::Fail(error)])
    }

    /// Requests received so far, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<RewriteRequest> {
        lock_unpoisoned(&self.state).requests.clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        lock_unpoisoned(&self.state).requests.len()
    }
}

impl RewriteProvider for ScriptedProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: "scripted".to_string(),
        }
    }

    fn rewrite(
        &self,
        request: &RewriteRequest,
        cancel: &CancelSignal,
    ) -> Result<String, RewriteError> {
        let mut state = lock_unpoisoned(&self.state);
        state.requests.push(request.clone());

        if is_cancelled(cancel) {
            return Err(RewriteError::Cancelled);
        }

        let reply = state
            .replies
            .pop_front()
            .unwrap_or_else(|| ScriptedReply::Text(request.document.clone()));
        let text = match reply {
            ScriptedReply::Text(text) => text,
            ScriptedReply::Wrap { prefix, suffix } => {
                format!("{prefix}{}{suffix}", request.document)
            }
            ScriptedReply::Fail(error) => return Err(error),
        };

        if text.trim().is_empty() {
            return Err(RewriteError::EmptyResponse {
                provider_id: MOCK_PROVIDER_ID.to_string(),
            });
        }
        Ok(text)
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

use std::time::Duration;

pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONVERSATION_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(800);

/// Delivery target and timing for one [`crate::ChatSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSessionConfig {
    /// Conversation display name; exact title first, then substring.
    pub conversation: String,
    /// Wait for the user to finish an interactive login.
    pub auth_timeout: Duration,
    /// Wait for a restored session to show the ready marker.
    pub ready_timeout: Duration,
    /// Wait for the exact conversation title to appear.
    pub conversation_timeout: Duration,
    /// Pause between consecutive chunks.
    pub settle_delay: Duration,
    /// Retry once with an interactive login when a stored session is stale.
    pub fallback_to_fresh_login: bool,
}

impl ChatSessionConfig {
    pub fn new(conversation: impl Into<String>) -> Self {
        Self {
            conversation: conversation.into(),
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            conversation_timeout: DEFAULT_CONVERSATION_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            fallback_to_fresh_login: true,
        }
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_conversation_timeout(mut self, timeout: Duration) -> Self {
        self.conversation_timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_fallback_to_fresh_login(mut self, enabled: bool) -> Self {
        self.fallback_to_fresh_login = enabled;
        self
    }
}

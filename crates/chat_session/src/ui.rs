use std::time::Duration;

use crate::error::UiError;
use crate::store::SessionState;

/// Narrow capability a chat web client exposes to [`crate::ChatSession`].
///
/// Selector lists and readiness markers live behind this trait so the
/// state machine never touches the page structure directly.
pub trait ChatUi {
    /// Opens the client, restoring `state` when given.
    fn launch(&mut self, state: Option<&SessionState>) -> Result<(), UiError>;

    /// Waits up to `timeout` for the client-ready marker.
    fn wait_until_ready(&mut self, timeout: Duration) -> Result<bool, UiError>;

    /// Captures the current login so it can be persisted.
    fn capture_state(&mut self) -> Result<SessionState, UiError>;

    /// Opens the conversation whose title equals `title` exactly.
    fn open_conversation(&mut self, title: &str, timeout: Duration) -> Result<bool, UiError>;

    /// Titles of the conversation entries currently listed, in display order.
    fn conversation_titles(&mut self) -> Result<Vec<String>, UiError>;

    /// Opens the `index`-th entry of the last [`Self::conversation_titles`] listing.
    fn open_conversation_at(&mut self, index: usize) -> Result<(), UiError>;

    /// Candidate message-input locators, most specific first.
    fn input_locators(&self) -> Vec<String>;

    fn has_input(&mut self, locator: &str) -> Result<bool, UiError>;

    /// Focuses the input at `locator`, inserts `text` and submits it.
    fn submit_text(&mut self, locator: &str, text: &str) -> Result<(), UiError>;

    /// Releases the browser. Must be safe to call after a failed launch.
    fn close(&mut self) -> Result<(), UiError>;
}

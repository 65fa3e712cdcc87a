use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mom_relay::MessageChunk;
use tracing::{debug, info, warn};

use crate::config::ChatSessionConfig;
use crate::error::{ChatFailure, UiError};
use crate::state::{transition, ChatEvent, ChatState};
use crate::store::{SessionState, SessionStore};
use crate::ui::ChatUi;

/// Shared cancellation flag, checked between chunks.
pub type CancelSignal = Arc<AtomicBool>;

#[must_use]
pub fn cancel_signal() -> CancelSignal {
    Arc::new(AtomicBool::new(false))
}

/// What happened to the session store during a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    Loaded,
    Saved,
    Quarantined { to: PathBuf },
}

/// Result of one [`ChatSession::deliver`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub state: ChatState,
    /// Every state visited, starting with `Unauthenticated`.
    pub trace: Vec<ChatState>,
    pub chunks_sent: usize,
    pub store_actions: Vec<StoreAction>,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        self.state == ChatState::Done
    }

    pub fn failure(&self) -> Option<&ChatFailure> {
        match &self.state {
            ChatState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Names of the visited states, for logs and assertions.
    pub fn trace_names(&self) -> Vec<&'static str> {
        self.trace.iter().map(ChatState::name).collect()
    }

    /// Number of chunks sent, or the failure.
    pub fn into_result(self) -> Result<usize, ChatFailure> {
        match self.state {
            ChatState::Failed(failure) => Err(failure),
            _ => Ok(self.chunks_sent),
        }
    }
}

#[derive(Debug, Default)]
struct RunContext {
    launched: bool,
    restarted: bool,
    sent: usize,
    store_actions: Vec<StoreAction>,
}

/// Drives one chat client through login, conversation lookup and sending.
pub struct ChatSession<U: ChatUi> {
    ui: U,
    store: SessionStore,
    config: ChatSessionConfig,
}

impl<U: ChatUi> ChatSession<U> {
    pub fn new(ui: U, store: SessionStore, config: ChatSessionConfig) -> Self {
        Self { ui, store, config }
    }

    pub fn config(&self) -> &ChatSessionConfig {
        &self.config
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn into_ui(self) -> U {
        self.ui
    }

    /// Sends `chunks` in order and returns the terminal outcome.
    ///
    /// The browser is closed before returning, whatever the outcome.
    pub fn deliver(&mut self, chunks: &[MessageChunk], cancel: &CancelSignal) -> DeliveryOutcome {
        let mut ctx = RunContext::default();
        let mut state = ChatState::Unauthenticated;
        let mut trace = vec![state.clone()];

        while !state.is_terminal() {
            let event = self.step(&state, chunks, cancel, &mut ctx);
            let next = transition(&state, event);
            debug!(from = state.name(), to = next.name(), "chat session transition");
            trace.push(next.clone());
            state = next;
        }

        if ctx.launched {
            if let Err(error) = self.ui.close() {
                warn!(%error, "closing chat client failed");
            }
        }

        match &state {
            ChatState::Failed(failure) => {
                warn!(%failure, sent = ctx.sent, total = chunks.len(), "chat delivery failed");
            }
            _ => info!(sent = ctx.sent, "chat delivery finished"),
        }

        DeliveryOutcome {
            state,
            trace,
            chunks_sent: ctx.sent,
            store_actions: ctx.store_actions,
        }
    }

    fn step(
        &mut self,
        state: &ChatState,
        chunks: &[MessageChunk],
        cancel: &CancelSignal,
        ctx: &mut RunContext,
    ) -> ChatEvent {
        let result = match state {
            ChatState::Unauthenticated => self.authenticate(ctx),
            ChatState::AwaitingInteractiveAuth => self.await_interactive_auth(ctx),
            ChatState::Authenticated => self.select_conversation(),
            ChatState::ConversationSelected { .. } => self.find_input(),
            ChatState::InputReady { .. } => Ok(ChatEvent::StartSending {
                total: chunks.len(),
            }),
            ChatState::Sending { locator, next, .. } => {
                self.send_chunk(locator, *next, chunks, cancel, ctx)
            }
            ChatState::Done | ChatState::Failed(_) => {
                return ChatEvent::Fault(ChatFailure::InvalidTransition {
                    state: state.name(),
                    event: "step",
                })
            }
        };
        result.unwrap_or_else(ChatEvent::Fault)
    }

    fn authenticate(&mut self, ctx: &mut RunContext) -> Result<ChatEvent, ChatFailure> {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(error) if error.is_unreadable_state() && self.config.fallback_to_fresh_login => {
                warn!(%error, "ignoring unreadable session state");
                self.quarantine(ctx)?;
                None
            }
            Err(error) => return Err(error.into()),
        };

        let Some(stored) = stored else {
            info!(path = %self.store.path().display(), "no stored session; interactive login required");
            self.launch(None, ctx)?;
            return Ok(ChatEvent::NoStoredSession);
        };

        ctx.store_actions.push(StoreAction::Loaded);
        self.launch(Some(&stored), ctx)?;
        if self.wait_ready(self.config.ready_timeout)? {
            info!("stored session restored");
            return Ok(ChatEvent::StoredSessionReady);
        }

        let path = self.store.path().to_path_buf();
        let restart = self.config.fallback_to_fresh_login && !ctx.restarted;
        warn!(path = %path.display(), restart, "stored session did not become ready");
        if restart {
            ctx.restarted = true;
            self.quarantine(ctx)?;
            if let Err(error) = self.ui.close() {
                warn!(%error, "closing stale chat client failed");
            }
            ctx.launched = false;
        }
        Ok(ChatEvent::StoredSessionStale { path, restart })
    }

    fn await_interactive_auth(&mut self, ctx: &mut RunContext) -> Result<ChatEvent, ChatFailure> {
        let waited = self.config.auth_timeout;
        info!(timeout_secs = waited.as_secs(), "waiting for interactive login");
        if !self.wait_ready(waited)? {
            return Ok(ChatEvent::AuthTimedOut { waited });
        }

        let captured = self.ui.capture_state().map_err(|error| ChatFailure::Ui {
            stage: "capturing login state",
            message: error.message,
        })?;
        self.store.save(&captured).map_err(ChatFailure::from)?;
        ctx.store_actions.push(StoreAction::Saved);
        info!(path = %self.store.path().display(), "login state saved");
        Ok(ChatEvent::InteractiveAuthCompleted)
    }

    fn select_conversation(&mut self) -> Result<ChatEvent, ChatFailure> {
        let name = self.config.conversation.clone();
        let exact = self
            .ui
            .open_conversation(&name, self.config.conversation_timeout)
            .map_err(|error| ui_failure("opening conversation", error))?;
        if exact {
            info!(conversation = %name, "conversation opened by exact title");
            return Ok(ChatEvent::ConversationOpened { title: name });
        }

        let titles = self
            .ui
            .conversation_titles()
            .map_err(|error| ui_failure("listing conversations", error))?;
        let needle = name.to_lowercase();
        let Some(index) = titles
            .iter()
            .position(|title| title.to_lowercase().contains(&needle))
        else {
            return Ok(ChatEvent::ConversationMissing {
                name,
                seen: titles.len(),
            });
        };

        self.ui
            .open_conversation_at(index)
            .map_err(|error| ui_failure("opening conversation", error))?;
        info!(conversation = %name, matched = %titles[index], "conversation opened by substring match");
        Ok(ChatEvent::ConversationOpened {
            title: titles[index].clone(),
        })
    }

    fn find_input(&mut self) -> Result<ChatEvent, ChatFailure> {
        let selectors = self.ui.input_locators();
        for locator in &selectors {
            let present = self
                .ui
                .has_input(locator)
                .map_err(|error| ui_failure("probing message input", error))?;
            if present {
                debug!(%locator, "message input found");
                return Ok(ChatEvent::InputFound {
                    locator: locator.clone(),
                });
            }
        }
        Ok(ChatEvent::InputMissing { selectors })
    }

    fn send_chunk(
        &mut self,
        locator: &str,
        index: usize,
        chunks: &[MessageChunk],
        cancel: &CancelSignal,
        ctx: &mut RunContext,
    ) -> Result<ChatEvent, ChatFailure> {
        if index > 0 && !self.config.settle_delay.is_zero() {
            std::thread::sleep(self.config.settle_delay);
        }
        if cancel.load(Ordering::Acquire) {
            return Ok(ChatEvent::CancelRequested);
        }

        let Some(chunk) = chunks.get(index) else {
            return Ok(ChatEvent::SendFailed {
                message: format!("chunk {index} is out of range"),
            });
        };
        match self.ui.submit_text(locator, &chunk.text) {
            Ok(()) => {
                ctx.sent += 1;
                info!(chunk = index + 1, total = chunks.len(), "chunk sent");
                Ok(ChatEvent::ChunkSent)
            }
            Err(error) => Ok(ChatEvent::SendFailed {
                message: error.message,
            }),
        }
    }

    fn launch(
        &mut self,
        state: Option<&SessionState>,
        ctx: &mut RunContext,
    ) -> Result<(), ChatFailure> {
        ctx.launched = true;
        self.ui.launch(state).map_err(|error| ChatFailure::Launch {
            message: error.message,
        })
    }

    fn wait_ready(&mut self, timeout: Duration) -> Result<bool, ChatFailure> {
        self.ui
            .wait_until_ready(timeout)
            .map_err(|error| ui_failure("waiting for the client to load", error))
    }

    fn quarantine(&mut self, ctx: &mut RunContext) -> Result<(), ChatFailure> {
        if let Some(to) = self.store.quarantine()? {
            info!(to = %to.display(), "stale session state moved aside");
            ctx.store_actions.push(StoreAction::Quarantined { to });
        }
        Ok(())
    }
}

fn ui_failure(stage: &'static str, error: UiError) -> ChatFailure {
    ChatFailure::Ui {
        stage,
        message: error.message,
    }
}

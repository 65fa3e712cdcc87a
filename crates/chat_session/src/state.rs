//! Delivery states and the pure transition function between them.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ChatFailure;

/// Where a delivery session stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatState {
    Unauthenticated,
    AwaitingInteractiveAuth,
    Authenticated,
    ConversationSelected {
        title: String,
    },
    InputReady {
        locator: String,
    },
    /// `next` is the index of the chunk about to be sent.
    Sending {
        locator: String,
        next: usize,
        total: usize,
    },
    Done,
    Failed(ChatFailure),
}

impl ChatState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AwaitingInteractiveAuth => "awaiting_interactive_auth",
            Self::Authenticated => "authenticated",
            Self::ConversationSelected { .. } => "conversation_selected",
            Self::InputReady { .. } => "input_ready",
            Self::Sending { .. } => "sending",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// What the driver observed while in a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    NoStoredSession,
    StoredSessionReady,
    /// A restored session never became ready. `restart` asks for one
    /// interactive-login attempt instead of failing.
    StoredSessionStale {
        path: PathBuf,
        restart: bool,
    },
    InteractiveAuthCompleted,
    AuthTimedOut {
        waited: Duration,
    },
    ConversationOpened {
        title: String,
    },
    ConversationMissing {
        name: String,
        seen: usize,
    },
    InputFound {
        locator: String,
    },
    InputMissing {
        selectors: Vec<String>,
    },
    StartSending {
        total: usize,
    },
    ChunkSent,
    SendFailed {
        message: String,
    },
    CancelRequested,
    /// An unexpected driver or store error.
    Fault(ChatFailure),
}

impl ChatEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoStoredSession => "no_stored_session",
            Self::StoredSessionReady => "stored_session_ready",
            Self::StoredSessionStale { .. } => "stored_session_stale",
            Self::InteractiveAuthCompleted => "interactive_auth_completed",
            Self::AuthTimedOut { .. } => "auth_timed_out",
            Self::ConversationOpened { .. } => "conversation_opened",
            Self::ConversationMissing { .. } => "conversation_missing",
            Self::InputFound { .. } => "input_found",
            Self::InputMissing { .. } => "input_missing",
            Self::StartSending { .. } => "start_sending",
            Self::ChunkSent => "chunk_sent",
            Self::SendFailed { .. } => "send_failed",
            Self::CancelRequested => "cancel_requested",
            Self::Fault(_) => "fault",
        }
    }
}

/// Computes the state that follows `state` after `event`.
///
/// Terminal states absorb every event. A pairing the machine does not define
/// ends in `Failed(InvalidTransition)`.
pub fn transition(state: &ChatState, event: ChatEvent) -> ChatState {
    use ChatEvent as E;
    use ChatState as S;

    if state.is_terminal() {
        return state.clone();
    }

    match (state, event) {
        (_, E::Fault(failure)) => S::Failed(failure),

        (S::Unauthenticated, E::NoStoredSession) => S::AwaitingInteractiveAuth,
        (S::Unauthenticated, E::StoredSessionReady) => S::Authenticated,
        (S::Unauthenticated, E::StoredSessionStale { restart: true, .. }) => S::Unauthenticated,
        (S::Unauthenticated, E::StoredSessionStale { path, restart: false }) => {
            S::Failed(ChatFailure::StaleSession { path })
        }

        (S::AwaitingInteractiveAuth, E::InteractiveAuthCompleted) => S::Authenticated,
        (S::AwaitingInteractiveAuth, E::AuthTimedOut { waited }) => {
            S::Failed(ChatFailure::AuthTimeout { waited })
        }

        (S::Authenticated, E::ConversationOpened { title }) => S::ConversationSelected { title },
        (S::Authenticated, E::ConversationMissing { name, seen }) => {
            S::Failed(ChatFailure::ConversationNotFound { name, seen })
        }

        (S::ConversationSelected { .. }, E::InputFound { locator }) => S::InputReady { locator },
        (S::ConversationSelected { .. }, E::InputMissing { selectors }) => {
            S::Failed(ChatFailure::InputNotFound { selectors })
        }

        (S::InputReady { .. }, E::StartSending { total: 0 }) => S::Done,
        (S::InputReady { locator }, E::StartSending { total }) => S::Sending {
            locator: locator.clone(),
            next: 0,
            total,
        },

        (
            S::Sending {
                locator,
                next,
                total,
            },
            E::ChunkSent,
        ) => {
            if next + 1 >= *total {
                S::Done
            } else {
                S::Sending {
                    locator: locator.clone(),
                    next: next + 1,
                    total: *total,
                }
            }
        }
        (S::Sending { next, total, .. }, E::SendFailed { message }) => {
            S::Failed(ChatFailure::SendError {
                index: *next,
                sent: *next,
                total: *total,
                message,
            })
        }
        (S::Sending { next, total, .. }, E::CancelRequested) => S::Failed(ChatFailure::Cancelled {
            sent: *next,
            total: *total,
        }),

        (state, event) => S::Failed(ChatFailure::InvalidTransition {
            state: state.name(),
            event: event.name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sending(next: usize, total: usize) -> ChatState {
        ChatState::Sending {
            locator: "div[contenteditable='true']".to_string(),
            next,
            total,
        }
    }

    #[test]
    fn fresh_login_path_reaches_authenticated() {
        let state = transition(&ChatState::Unauthenticated, ChatEvent::NoStoredSession);
        assert_eq!(state, ChatState::AwaitingInteractiveAuth);
        let state = transition(&state, ChatEvent::InteractiveAuthCompleted);
        assert_eq!(state, ChatState::Authenticated);
    }

    #[test]
    fn stale_session_restarts_or_fails() {
        let path = PathBuf::from("wa_state.json");
        assert_eq!(
            transition(
                &ChatState::Unauthenticated,
                ChatEvent::StoredSessionStale {
                    path: path.clone(),
                    restart: true
                }
            ),
            ChatState::Unauthenticated
        );
        assert_eq!(
            transition(
                &ChatState::Unauthenticated,
                ChatEvent::StoredSessionStale {
                    path: path.clone(),
                    restart: false
                }
            ),
            ChatState::Failed(ChatFailure::StaleSession { path })
        );
    }

    #[test]
    fn auth_timeout_is_terminal() {
        let waited = Duration::from_secs(120);
        let state = transition(
            &ChatState::AwaitingInteractiveAuth,
            ChatEvent::AuthTimedOut { waited },
        );
        assert_eq!(state, ChatState::Failed(ChatFailure::AuthTimeout { waited }));
        assert_eq!(transition(&state, ChatEvent::ChunkSent), state);
    }

    #[test]
    fn sending_advances_until_done() {
        let input = ChatState::InputReady {
            locator: "div[contenteditable='true']".to_string(),
        };
        let state = transition(&input, ChatEvent::StartSending { total: 2 });
        assert_eq!(state, sending(0, 2));
        let state = transition(&state, ChatEvent::ChunkSent);
        assert_eq!(state, sending(1, 2));
        assert_eq!(transition(&state, ChatEvent::ChunkSent), ChatState::Done);
    }

    #[test]
    fn zero_chunks_complete_immediately() {
        let input = ChatState::InputReady {
            locator: "x".to_string(),
        };
        assert_eq!(
            transition(&input, ChatEvent::StartSending { total: 0 }),
            ChatState::Done
        );
    }

    #[test]
    fn send_failure_and_cancel_report_progress() {
        assert_eq!(
            transition(
                &sending(2, 5),
                ChatEvent::SendFailed {
                    message: "detached".to_string()
                }
            ),
            ChatState::Failed(ChatFailure::SendError {
                index: 2,
                sent: 2,
                total: 5,
                message: "detached".to_string(),
            })
        );
        assert_eq!(
            transition(&sending(1, 3), ChatEvent::CancelRequested),
            ChatState::Failed(ChatFailure::Cancelled { sent: 1, total: 3 })
        );
    }

    #[test]
    fn fault_fails_from_any_live_state() {
        let failure = ChatFailure::Launch {
            message: "no driver".to_string(),
        };
        for state in [
            ChatState::Unauthenticated,
            ChatState::Authenticated,
            sending(0, 1),
        ] {
            assert_eq!(
                transition(&state, ChatEvent::Fault(failure.clone())),
                ChatState::Failed(failure.clone())
            );
        }
    }

    #[test]
    fn undefined_pairing_is_invalid_transition() {
        assert_eq!(
            transition(&ChatState::Authenticated, ChatEvent::ChunkSent),
            ChatState::Failed(ChatFailure::InvalidTransition {
                state: "authenticated",
                event: "chunk_sent",
            })
        );
    }
}

//! Authenticated delivery of message chunks into a web chat client.
//!
//! [`ChatSession`] drives an explicit state machine ([`ChatState`] plus the
//! pure [`transition`] function) against a narrow [`ChatUi`] capability.
//! [`WhatsAppWeb`] is the WebDriver-backed implementation; tests substitute a
//! scripted fake. Login state persists between runs through [`SessionStore`].

pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod store;
pub mod ui;
pub mod whatsapp;

pub use config::ChatSessionConfig;
pub use error::{ChatFailure, StoreError, UiError};
pub use session::{cancel_signal, CancelSignal, ChatSession, DeliveryOutcome, StoreAction};
pub use state::{transition, ChatEvent, ChatState};
pub use store::{SessionState, SessionStore, SESSION_STATE_VERSION};
pub use ui::ChatUi;
pub use whatsapp::{WhatsAppOptions, WhatsAppWeb};

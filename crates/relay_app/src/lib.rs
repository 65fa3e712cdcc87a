//! Delivery pipeline and process glue for the `mom_relay` binary.
//!
//! The pipeline reads rich-text rows and rewrites them into minutes. The
//! minutes are saved as a timestamped markdown copy before the chat-markup
//! chunks go out through a [`chat_session::ChatSession`].

pub mod artifact;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod setup;
#[cfg(unix)]
pub mod signals;

pub use artifact::{ArtifactWriter, RunStamp};
pub use config::{ConfigError, RelayConfig, RewriteBackend};
pub use error::{RelayError, Stage};
pub use pipeline::{
    DeliveryPipeline, DeliveryReport, GridFileSource, PreparedMessage, RowSource, SheetsApiSource,
};
pub use setup::RunOptions;

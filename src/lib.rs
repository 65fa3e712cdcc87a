//! Text core for relaying spreadsheet meeting notes into a chat client.
//!
//! The pipeline is pure and allocation-only:
//!
//! 1. [`merge_cell`] turns one cell's positional style runs into inline
//!    markdown (`***both***`, `**bold**`, `*italic*`).
//! 2. [`flatten_rows`] joins cells with a space and rows with a blank line,
//!    failing with [`EmptySourceError`] when nothing visible remains.
//! 3. [`markdown_to_whatsapp`] rewrites [`Markdown`] emphasis into the chat
//!    dialect (`*_both_*`, `*bold*`, `_italic_`). The result is a
//!    [`ChatText`], which cannot be passed back in.
//! 4. [`chunk_text`] splits the result into transport-sized
//!    [`MessageChunk`]s at the cleanest boundary available.
//!
//! Network, browser, and filesystem concerns live in the workspace crates that
//! depend on this one.

pub mod cell;
pub mod chunk;
pub mod error;
pub mod flatten;
pub mod markup;
pub mod runs;

pub use cell::{Cell, Row, RunSpan, StyledRun, TextStyle};
pub use chunk::{chunk_text, MessageChunk, DEFAULT_MAX_CHUNK_LEN};
pub use error::EmptySourceError;
pub use flatten::{flatten_row, flatten_rows, Document};
pub use markup::{markdown_to_whatsapp, translate_with, ChatDialect, ChatText, Markdown};
pub use runs::merge_cell;

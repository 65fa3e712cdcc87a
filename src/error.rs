use thiserror::Error;

/// The flattened sheet produced no visible text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sheet produced no text to send ({rows} rows scanned, {cells} cells scanned)")]
pub struct EmptySourceError {
    pub rows: usize,
    pub cells: usize,
}

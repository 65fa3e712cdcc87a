//! Spreadsheet-shaped input model consumed by the text core.
//!
//! Run offsets are **character** (`char`) indices into the cell text, not UTF-8
//! byte offsets. Transport adapters are responsible for converting whatever
//! unit their wire format uses.

use serde::{Deserialize, Serialize};

/// Bold/italic formatting state shared by runs and cell defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

impl TextStyle {
    pub const PLAIN: Self = Self {
        bold: false,
        italic: false,
    };

    #[must_use]
    pub const fn new(bold: bool, italic: bool) -> Self {
        Self { bold, italic }
    }

    #[must_use]
    pub const fn bold() -> Self {
        Self::new(true, false)
    }

    #[must_use]
    pub const fn italic() -> Self {
        Self::new(false, true)
    }

    #[must_use]
    pub const fn bold_italic() -> Self {
        Self::new(true, true)
    }

    #[must_use]
    pub const fn is_plain(self) -> bool {
        !self.bold && !self.italic
    }
}

/// A style run starting at `start`. The end is implied by the next run's start
/// (or the text length for the last run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledRun {
    pub start: usize,
    #[serde(flatten)]
    pub style: TextStyle,
}

impl StyledRun {
    #[must_use]
    pub const fn new(start: usize, style: TextStyle) -> Self {
        Self { start, style }
    }
}

/// A run with its derived exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSpan {
    pub start: usize,
    pub end: usize,
    pub style: TextStyle,
}

impl RunSpan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One spreadsheet cell: raw text, optional style runs, and the cell-level
/// default formatting used when no runs are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<StyledRun>,
    #[serde(default)]
    pub format: TextStyle,
}

impl Cell {
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            runs: Vec::new(),
            format: TextStyle::PLAIN,
        }
    }

    #[must_use]
    pub fn formatted(text: impl Into<String>, format: TextStyle) -> Self {
        Self {
            text: text.into(),
            runs: Vec::new(),
            format,
        }
    }

    #[must_use]
    pub fn with_runs(text: impl Into<String>, runs: Vec<StyledRun>) -> Self {
        Self {
            text: text.into(),
            runs,
            format: TextStyle::PLAIN,
        }
    }

    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Resolves runs into contiguous spans covering the whole text.
    ///
    /// Runs are stable-sorted by `start` and clamped to the text length. Text
    /// before the first run takes the cell default format, so no character is
    /// ever dropped. Zero-length spans are omitted.
    #[must_use]
    pub fn spans(&self) -> Vec<RunSpan> {
        let len = self.char_len();
        if len == 0 {
            return Vec::new();
        }
        if self.runs.is_empty() {
            return vec![RunSpan {
                start: 0,
                end: len,
                style: self.format,
            }];
        }

        let mut sorted = self.runs.clone();
        sorted.sort_by_key(|run| run.start);

        let mut spans = Vec::with_capacity(sorted.len() + 1);
        let first_start = sorted[0].start.min(len);
        if first_start > 0 {
            spans.push(RunSpan {
                start: 0,
                end: first_start,
                style: self.format,
            });
        }

        for (index, run) in sorted.iter().enumerate() {
            let start = run.start.min(len);
            let end = sorted
                .get(index + 1)
                .map_or(len, |next| next.start.min(len));
            if end > start {
                spans.push(RunSpan {
                    start,
                    end,
                    style: run.style,
                });
            }
        }

        spans
    }
}

/// An ordered sequence of cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    #[must_use]
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }
}

impl FromIterator<Cell> for Row {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// Returns the substring covering the `[start, end)` character range.
pub(crate) fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }

    let mut start_byte = None;
    let mut end_byte = None;
    for (i, (byte_idx, _)) in text.char_indices().enumerate() {
        if i == start {
            start_byte = Some(byte_idx);
        }
        if i == end {
            end_byte = Some(byte_idx);
            break;
        }
    }

    let start_byte = start_byte.unwrap_or(text.len());
    let end_byte = end_byte.unwrap_or(text.len());
    &text[start_byte..end_byte]
}

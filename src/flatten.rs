//! Row/cell grid to a paragraph-per-row markdown document.

use std::fmt;

use crate::cell::Row;
use crate::error::EmptySourceError;
use crate::runs::merge_cell;

/// Separator between cells of one row.
pub const CELL_SEPARATOR: &str = " ";
/// Separator between rows (one paragraph per row).
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Markdown assembled from sheet rows. Never whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document(String);

impl Document {
    /// Wraps already-assembled markdown, rejecting whitespace-only text.
    pub fn new(markdown: impl Into<String>) -> Result<Self, EmptySourceError> {
        let markdown = markdown.into();
        if markdown.trim().is_empty() {
            return Err(EmptySourceError { rows: 0, cells: 0 });
        }
        Ok(Self(markdown))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Number of paragraphs (non-empty rows) in the document.
    #[must_use]
    pub fn paragraph_count(&self) -> usize {
        self.0.split(PARAGRAPH_SEPARATOR).count()
    }
}

impl AsRef<str> for Document {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders a single row, skipping cells without visible text.
#[must_use]
pub fn flatten_row(row: &Row) -> Option<String> {
    let parts: Vec<String> = row
        .cells
        .iter()
        .map(merge_cell)
        .filter(|markdown| !markdown.trim().is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(CELL_SEPARATOR))
    }
}

/// Flattens the grid into one markdown document.
///
/// Rows with no visible text are skipped entirely. Fails with
/// [`EmptySourceError`] when nothing visible remains.
pub fn flatten_rows(rows: &[Row]) -> Result<Document, EmptySourceError> {
    let paragraphs: Vec<String> = rows.iter().filter_map(flatten_row).collect();
    let markdown = paragraphs.join(PARAGRAPH_SEPARATOR);

    if markdown.trim().is_empty() {
        return Err(EmptySourceError {
            rows: rows.len(),
            cells: rows.iter().map(|row| row.cells.len()).sum(),
        });
    }

    Ok(Document(markdown))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cell::{Cell, StyledRun, TextStyle};

    #[test]
    fn cells_join_with_space_and_rows_with_blank_line() {
        let rows = vec![
            Row::new(vec![
                Cell::formatted("Standup", TextStyle::bold()),
                Cell::plain("2026-10-18"),
            ]),
            Row::new(vec![Cell::plain(""), Cell::plain("   ")]),
            Row::new(vec![Cell::with_runs(
                "Ship it today",
                vec![
                    StyledRun::new(0, TextStyle::PLAIN),
                    StyledRun::new(8, TextStyle::italic()),
                ],
            )]),
        ];

        let document = flatten_rows(&rows).expect("rows contain text");
        assert_eq!(
            document.as_str(),
            "**Standup** 2026-10-18\n\nShip it *today*"
        );
        assert_eq!(document.paragraph_count(), 2);
    }

    #[test]
    fn empty_grid_is_rejected() {
        let rows = vec![
            Row::new(vec![Cell::plain(""), Cell::formatted("", TextStyle::bold())]),
            Row::new(Vec::new()),
        ];

        let error = flatten_rows(&rows).expect_err("grid has no text");
        assert_matches!(error, EmptySourceError { rows: 2, cells: 2 });
    }

    #[test]
    fn no_rows_is_rejected() {
        assert!(flatten_rows(&[]).is_err());
    }

    #[test]
    fn document_new_rejects_whitespace() {
        assert!(Document::new(" \n\t").is_err());
        assert_eq!(Document::new("x").expect("non-empty").as_str(), "x");
    }
}

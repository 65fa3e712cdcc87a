//! Decoding of `spreadsheets.get` grid payloads.

use std::path::Path;

use mom_relay::{Cell, Row, StyledRun, TextStyle};
use serde::Deserialize;

use crate::error::SheetsApiError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spreadsheet {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    #[serde(default)]
    pub data: Vec<GridData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridData {
    #[serde(default)]
    pub row_data: Vec<RowData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowData {
    #[serde(default)]
    pub values: Vec<CellData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    pub user_entered_value: Option<ExtendedValue>,
    pub formatted_value: Option<String>,
    pub user_entered_format: Option<CellFormat>,
    pub effective_format: Option<CellFormat>,
    #[serde(default)]
    pub text_format_runs: Vec<TextFormatRun>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedValue {
    pub string_value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellFormat {
    pub text_format: Option<TextFormat>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFormat {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
}

/// A run's `format` is a `TextFormat`; some exporters nest it one level
/// deeper under `textFormat`, which is accepted too.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFormat {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub text_format: Option<TextFormat>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFormatRun {
    /// UTF-16 code-unit offset; absent means 0.
    #[serde(default)]
    pub start_index: usize,
    #[serde(default)]
    pub format: RunFormat,
}

impl TextFormat {
    fn resolve(self, inherited: TextStyle) -> TextStyle {
        TextStyle {
            bold: self.bold.unwrap_or(inherited.bold),
            italic: self.italic.unwrap_or(inherited.italic),
        }
    }
}

impl RunFormat {
    fn resolve(self, inherited: TextStyle) -> TextStyle {
        let direct = TextFormat {
            bold: self.bold,
            italic: self.italic,
        };
        let style = direct.resolve(inherited);
        match self.text_format {
            Some(nested) => nested.resolve(style),
            None => style,
        }
    }
}

impl CellData {
    fn text(&self) -> &str {
        self.user_entered_value
            .as_ref()
            .and_then(|value| value.string_value.as_deref())
            .or(self.formatted_value.as_deref())
            .unwrap_or("")
    }

    fn default_style(&self) -> TextStyle {
        self.user_entered_format
            .as_ref()
            .and_then(|format| format.text_format)
            .or_else(|| {
                self.effective_format
                    .as_ref()
                    .and_then(|format| format.text_format)
            })
            .map_or(TextStyle::PLAIN, |format| format.resolve(TextStyle::PLAIN))
    }

    /// Converts to the core cell model.
    pub fn to_cell(&self) -> Cell {
        let text = self.text();
        let format = self.default_style();
        let runs = self
            .text_format_runs
            .iter()
            .map(|run| {
                StyledRun::new(
                    utf16_to_char_index(text, run.start_index),
                    run.format.resolve(format),
                )
            })
            .collect();

        Cell {
            text: text.to_owned(),
            runs,
            format,
        }
    }
}

/// Maps a UTF-16 code-unit offset onto a `char` index, clamping to the end.
#[must_use]
pub fn utf16_to_char_index(text: &str, utf16_offset: usize) -> usize {
    let mut units = 0;
    for (index, ch) in text.chars().enumerate() {
        if units >= utf16_offset {
            return index;
        }
        units += ch.len_utf16();
    }
    text.chars().count()
}

/// Rows of the first grid of the first sheet; missing levels yield no rows.
#[must_use]
pub fn rows_from_spreadsheet(spreadsheet: &Spreadsheet) -> Vec<Row> {
    let Some(grid) = spreadsheet
        .sheets
        .first()
        .and_then(|sheet| sheet.data.first())
    else {
        return Vec::new();
    };

    grid.row_data
        .iter()
        .map(|row| row.values.iter().map(CellData::to_cell).collect())
        .collect()
}

/// Decodes a `spreadsheets.get` JSON body into rows.
pub fn parse_grid_json(body: &str) -> Result<Vec<Row>, SheetsApiError> {
    let spreadsheet: Spreadsheet = serde_json::from_str(body)?;
    Ok(rows_from_spreadsheet(&spreadsheet))
}

/// Loads a saved `spreadsheets.get` response from disk.
pub fn load_grid_file(path: &Path) -> Result<Vec<Row>, SheetsApiError> {
    let body = std::fs::read_to_string(path).map_err(|source| SheetsApiError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_grid_json(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_offsets_map_past_surrogate_pairs() {
        let text = "a😀b";
        assert_eq!(utf16_to_char_index(text, 0), 0);
        assert_eq!(utf16_to_char_index(text, 1), 1);
        assert_eq!(utf16_to_char_index(text, 3), 2);
        assert_eq!(utf16_to_char_index(text, 99), 3);
    }

    #[test]
    fn run_format_inherits_cell_default() {
        let run = RunFormat {
            bold: None,
            italic: Some(true),
            text_format: None,
        };
        assert_eq!(run.resolve(TextStyle::bold()), TextStyle::bold_italic());
    }

    #[test]
    fn nested_text_format_overrides_direct_flags() {
        let run = RunFormat {
            bold: Some(true),
            italic: None,
            text_format: Some(TextFormat {
                bold: Some(false),
                italic: Some(true),
            }),
        };
        assert_eq!(run.resolve(TextStyle::PLAIN), TextStyle::italic());
    }
}

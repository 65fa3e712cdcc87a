use std::io::Write;

use mom_relay::{flatten_rows, merge_cell, TextStyle};
use pretty_assertions::assert_eq;
use serde_json::json;
use sheets_api::{load_grid_file, parse_grid_json, SheetsApiError};

fn minutes_payload() -> serde_json::Value {
    json!({
        "sheets": [{
            "data": [{
                "rowData": [
                    {
                        "values": [
                            {
                                "userEnteredValue": {"stringValue": "Sprint review"},
                                "userEnteredFormat": {"textFormat": {"bold": true, "italic": true}}
                            }
                        ]
                    },
                    {},
                    {
                        "values": [
                            {
                                "userEnteredValue": {"stringValue": "HelloWorld"},
                                "textFormatRuns": [
                                    {"format": {"bold": true}},
                                    {"startIndex": 5, "format": {"italic": true}}
                                ]
                            },
                            {"formattedValue": "42%"},
                            {}
                        ]
                    }
                ]
            }]
        }]
    })
}

#[test]
fn grid_payload_decodes_cells_runs_and_defaults() {
    let rows = parse_grid_json(&minutes_payload().to_string()).expect("payload should decode");

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].cells[0].format, TextStyle::bold_italic());
    assert!(rows[1].cells.is_empty());
    assert_eq!(merge_cell(&rows[2].cells[0]), "**Hello***World*");
    assert_eq!(rows[2].cells[1].text, "42%");
    assert_eq!(rows[2].cells[2].text, "");

    let document = flatten_rows(&rows).expect("document has text");
    assert_eq!(
        document.as_str(),
        "***Sprint review***\n\n**Hello***World* 42%"
    );
}

#[test]
fn run_offsets_are_converted_from_utf16() {
    let body = json!({
        "sheets": [{"data": [{"rowData": [{"values": [{
            "userEnteredValue": {"stringValue": "🎉 Launch"},
            "textFormatRuns": [
                {"startIndex": 0, "format": {}},
                {"startIndex": 3, "format": {"bold": true}}
            ]
        }]}]}]}]
    });

    let rows = parse_grid_json(&body.to_string()).expect("payload should decode");
    assert_eq!(merge_cell(&rows[0].cells[0]), "🎉 **Launch**");
}

#[test]
fn missing_sheets_or_data_yield_no_rows() {
    assert!(parse_grid_json("{}").expect("empty object").is_empty());
    assert!(parse_grid_json(r#"{"sheets":[{}]}"#)
        .expect("sheet without data")
        .is_empty());
}

#[test]
fn malformed_payload_is_a_serde_error() {
    let error = parse_grid_json(r#"{"sheets": 7}"#).expect_err("sheets must be a list");
    assert!(matches!(error, SheetsApiError::Serde(_)));
}

#[test]
fn grid_file_round_trips_through_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "{}", minutes_payload()).expect("write payload");

    let rows = load_grid_file(file.path()).expect("file should load");
    assert_eq!(rows.len(), 3);

    let missing = load_grid_file(&file.path().with_extension("missing"))
        .expect_err("missing file must fail");
    assert!(matches!(missing, SheetsApiError::Io { .. }));
    assert!(missing.to_string().contains("failed to read"));
}

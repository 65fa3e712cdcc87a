use sheets_api::url::{grid_url, DEFAULT_SHEETS_BASE_URL};
use sheets_api::SheetsApiError;

#[test]
fn grid_url_targets_spreadsheet_with_grid_data() {
    let url = grid_url(DEFAULT_SHEETS_BASE_URL, "sheet-123", "DSM", None).expect("url");

    assert_eq!(url.host_str(), Some("sheets.googleapis.com"));
    assert_eq!(url.path(), "/v4/spreadsheets/sheet-123");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("ranges".to_string(), "DSM".to_string())));
    assert!(pairs.contains(&("includeGridData".to_string(), "true".to_string())));
    assert!(!pairs.iter().any(|(key, _)| key == "key"));
}

#[test]
fn grid_url_encodes_range_and_appends_api_key() {
    let url = grid_url(
        "https://sheets.example.test/v4/spreadsheets/",
        "abc",
        "Team Notes!A1:C9",
        Some("k-1"),
    )
    .expect("url");

    assert_eq!(url.path(), "/v4/spreadsheets/abc");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("ranges".to_string(), "Team Notes!A1:C9".to_string())));
    assert!(pairs.contains(&("key".to_string(), "k-1".to_string())));
}

#[test]
fn grid_url_requires_spreadsheet_id() {
    let error = grid_url(DEFAULT_SHEETS_BASE_URL, "  ", "DSM", None).expect_err("id required");
    assert!(matches!(error, SheetsApiError::MissingSpreadsheetId));
}

#[test]
fn grid_url_rejects_unparseable_base() {
    let error = grid_url("not a url", "abc", "DSM", None).expect_err("invalid base");
    assert!(matches!(error, SheetsApiError::InvalidBaseUrl(_)));
}

use url::Url;

use crate::error::SheetsApiError;

/// Default base URL for Sheets v4 requests.
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Field mask limiting the response to what grid decoding reads.
pub const GRID_FIELDS: &str = "sheets(data(rowData(values(userEnteredValue,formattedValue,\
userEnteredFormat/textFormat,effectiveFormat/textFormat,textFormatRuns))))";

/// Builds the `spreadsheets.get` URL returning grid data for `range`.
///
/// `range` is usually a sheet name (`DSM`) or an A1 range (`DSM!A1:D40`).
/// A trailing slash or `/spreadsheets` suffix on the base is tolerated.
pub fn grid_url(
    base_url: &str,
    spreadsheet_id: &str,
    range: &str,
    api_key: Option<&str>,
) -> Result<Url, SheetsApiError> {
    let spreadsheet_id = spreadsheet_id.trim();
    if spreadsheet_id.is_empty() {
        return Err(SheetsApiError::MissingSpreadsheetId);
    }

    let base = if base_url.trim().is_empty() {
        DEFAULT_SHEETS_BASE_URL
    } else {
        base_url.trim()
    };
    let base = base.trim_end_matches('/');
    let base = base.strip_suffix("/spreadsheets").unwrap_or(base);

    let mut url = Url::parse(&format!("{base}/spreadsheets/"))
        .map_err(|error| SheetsApiError::InvalidBaseUrl(format!("{base}: {error}")))?;
    url.path_segments_mut()
        .map_err(|_| SheetsApiError::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .push(spreadsheet_id);

    {
        let mut query = url.query_pairs_mut();
        if !range.trim().is_empty() {
            query.append_pair("ranges", range.trim());
        }
        query.append_pair("includeGridData", "true");
        query.append_pair("fields", GRID_FIELDS);
        if let Some(key) = api_key {
            query.append_pair("key", key);
        }
    }

    Ok(url)
}

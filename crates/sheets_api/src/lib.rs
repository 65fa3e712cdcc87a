//! Read-only Google Sheets transport for formatted cell grids.
//!
//! This crate fetches (or loads from disk) a `spreadsheets.get` response with
//! grid data and decodes it into the provider-neutral [`mom_relay::Row`] model.
//! Credentials are a bearer token, an API key, or a service-account key whose
//! signed JWT grant is exchanged for access tokens as needed.
//!
//! Style-run offsets arrive in UTF-16 code units and are converted to
//! character indices during decoding.

pub mod client;
pub mod config;
pub mod error;
pub mod grid;
pub mod service_account;
pub mod url;

pub use client::SheetsApiClient;
pub use config::SheetsApiConfig;
pub use error::SheetsApiError;
pub use grid::{load_grid_file, parse_grid_json, rows_from_spreadsheet, Spreadsheet};
pub use service_account::{ServiceAccountAuth, ServiceAccountKey, SHEETS_READONLY_SCOPE};
pub use url::{grid_url, DEFAULT_SHEETS_BASE_URL};

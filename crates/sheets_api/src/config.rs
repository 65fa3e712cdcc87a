use std::time::Duration;

use crate::service_account::ServiceAccountKey;
use crate::url::DEFAULT_SHEETS_BASE_URL;

/// Transport configuration for Sheets API requests.
#[derive(Debug, Clone)]
pub struct SheetsApiConfig {
    /// OAuth access token passed as `Authorization: Bearer`.
    pub access_token: Option<String>,
    /// API key for publicly shared sheets, passed as the `key` query parameter.
    pub api_key: Option<String>,
    /// Service-account key exchanged for access tokens on demand.
    pub service_account: Option<ServiceAccountKey>,
    /// Base URL for the Sheets v4 API.
    pub base_url: String,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl Default for SheetsApiConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_key: None,
            service_account: None,
            base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl SheetsApiConfig {
    pub fn with_access_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            ..Self::default()
        }
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn with_service_account(key: ServiceAccountKey) -> Self {
        Self {
            service_account: Some(key),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn bearer_token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub(crate) fn query_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

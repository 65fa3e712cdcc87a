use mom_relay::Row;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;

use crate::config::SheetsApiConfig;
use crate::error::{parse_error_message, SheetsApiError};
use crate::grid::parse_grid_json;
use crate::service_account::{ServiceAccountAuth, SHEETS_READONLY_SCOPE};
use crate::url::grid_url;

#[derive(Debug)]
pub struct SheetsApiClient {
    http: Client,
    config: SheetsApiConfig,
    service_account: Option<ServiceAccountAuth>,
}

impl SheetsApiClient {
    pub fn new(config: SheetsApiConfig) -> Result<Self, SheetsApiError> {
        if config.bearer_token().is_none()
            && config.query_key().is_none()
            && config.service_account.is_none()
        {
            return Err(SheetsApiError::MissingCredentials);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(SheetsApiError::from)?;
        let service_account = config
            .service_account
            .clone()
            .map(|key| ServiceAccountAuth::new(http.clone(), key, SHEETS_READONLY_SCOPE));
        Ok(Self {
            http,
            config,
            service_account,
        })
    }

    pub fn service_account(&self) -> Option<&ServiceAccountAuth> {
        self.service_account.as_ref()
    }

    pub fn config(&self) -> &SheetsApiConfig {
        &self.config
    }

    pub fn build_request(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<reqwest::RequestBuilder, SheetsApiError> {
        self.build_request_with_token(spreadsheet_id, range, self.config.bearer_token())
    }

    /// Like [`Self::build_request`], authorizing with `token` instead of the configured one.
    pub fn build_request_with_token(
        &self,
        spreadsheet_id: &str,
        range: &str,
        token: Option<&str>,
    ) -> Result<reqwest::RequestBuilder, SheetsApiError> {
        let url = grid_url(
            &self.config.base_url,
            spreadsheet_id,
            range,
            self.config.query_key(),
        )?;

        let mut request = self
            .http
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                SheetsApiError::InvalidCredentials(
                    "access token is not a valid header value".into(),
                )
            })?;
            request = request.header(AUTHORIZATION, value);
        }
        Ok(request)
    }

    /// Fetches the formatted grid of `range` and decodes it into rows.
    pub async fn fetch_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Row>, SheetsApiError> {
        let token = match (self.config.bearer_token(), &self.service_account) {
            (Some(token), _) => Some(token.to_owned()),
            (None, Some(auth)) => Some(auth.access_token().await?),
            (None, None) => None,
        };
        let response = self
            .build_request_with_token(spreadsheet_id, range, token.as_deref())?
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SheetsApiError::Status(
                status,
                parse_error_message(status, &body),
            ));
        }

        parse_grid_json(&body)
    }
}

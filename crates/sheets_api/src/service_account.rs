//! Google service-account credentials: JWT bearer grant (RFC 7523) exchanged
//! for a short-lived access token.

use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{parse_error_message, SheetsApiError};

pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion; Google caps it at one hour.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Cached tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The JSON key file downloaded for a service account.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, SheetsApiError> {
        let key: Self = serde_json::from_str(json).map_err(|error| {
            SheetsApiError::InvalidCredentials(format!("malformed service account key: {error}"))
        })?;
        if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
            return Err(SheetsApiError::InvalidCredentials(
                "service account key lacks client_email or private_key".to_string(),
            ));
        }
        Ok(key)
    }

    pub fn from_file(path: &Path) -> Result<Self, SheetsApiError> {
        let json = std::fs::read_to_string(path).map_err(|source| SheetsApiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// Claims of the signed grant assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl GrantClaims {
    pub fn new(key: &ServiceAccountKey, scope: &str, issued_at: i64) -> Self {
        Self {
            iss: key.client_email.clone(),
            scope: scope.to_string(),
            aud: key.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        }
    }
}

/// Signs `claims` with the key's RSA private key (RS256).
pub fn sign_assertion(key: &ServiceAccountKey, claims: &GrantClaims) -> Result<String, SheetsApiError> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|error| {
        SheetsApiError::InvalidCredentials(format!("service account private key: {error}"))
    })?;
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();
    jsonwebtoken::encode(&header, claims, &encoding_key).map_err(|error| {
        SheetsApiError::InvalidCredentials(format!("failed to sign grant assertion: {error}"))
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

impl AccessToken {
    fn is_fresh(&self, now: i64) -> bool {
        self.expires_at - EXPIRY_MARGIN_SECS > now
    }
}

/// Exchanges signed assertions for access tokens, caching the latest one.
#[derive(Debug)]
pub struct ServiceAccountAuth {
    http: Client,
    key: ServiceAccountKey,
    scope: String,
    cached: Mutex<Option<AccessToken>>,
}

impl ServiceAccountAuth {
    pub fn new(http: Client, key: ServiceAccountKey, scope: impl Into<String>) -> Self {
        Self {
            http,
            key,
            scope: scope.into(),
            cached: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    /// The token-endpoint POST for an assertion issued at `issued_at`.
    pub fn build_token_request(&self, issued_at: i64) -> Result<reqwest::RequestBuilder, SheetsApiError> {
        let claims = GrantClaims::new(&self.key, &self.scope, issued_at);
        let assertion = sign_assertion(&self.key, &claims)?;
        Ok(self
            .http
            .post(&self.key.token_uri)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .form(&[
                ("grant_type", JWT_BEARER_GRANT_TYPE),
                ("assertion", assertion.as_str()),
            ]))
    }

    /// A valid access token, exchanging a new assertion when the cached one is near expiry.
    pub async fn access_token(&self) -> Result<String, SheetsApiError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        if let Some(token) = self.cached_token(now) {
            return Ok(token);
        }

        let response = self.build_token_request(now)?.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SheetsApiError::TokenExchange(
                status,
                parse_error_message(status, &body),
            ));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        let token = AccessToken {
            token: parsed.access_token,
            expires_at: now + parsed.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS),
        };
        let value = token.token.clone();
        if let Ok(mut cached) = self.cached.lock() {
            *cached = Some(token);
        }
        Ok(value)
    }

    fn cached_token(&self, now: i64) -> Option<String> {
        let cached = self.cached.lock().ok()?;
        cached
            .as_ref()
            .filter(|token| token.is_fresh(now))
            .map(|token| token.token.clone())
    }
}

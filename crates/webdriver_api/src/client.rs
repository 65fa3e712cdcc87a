use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::config::{BrowserOptions, WebDriverConfig};
use crate::error::WebDriverError;
use crate::payload::{
    css_locator, new_session_body, script_body, Cookie, ElementRef, NewSessionValue,
};

/// Connection to a WebDriver remote end; creates sessions.
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: Client,
    endpoint: String,
    config: WebDriverConfig,
}

impl WebDriverClient {
    pub fn new(config: WebDriverConfig) -> Result<Self, WebDriverError> {
        let endpoint = normalize_endpoint(&config.endpoint)?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(WebDriverError::from)?;
        Ok(Self {
            http,
            endpoint,
            config,
        })
    }

    pub fn config(&self) -> &WebDriverConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn build_new_session(&self, options: &BrowserOptions) -> reqwest::RequestBuilder {
        build_command(
            &self.http,
            Method::POST,
            format!("{}/session", self.endpoint),
            Some(&new_session_body(options)),
        )
    }

    /// Starts a browser session.
    pub async fn new_session(
        &self,
        options: &BrowserOptions,
    ) -> Result<WebDriverSession, WebDriverError> {
        let value = send_command(self.build_new_session(options)).await?;
        let created: NewSessionValue = serde_json::from_value(value)?;
        Ok(self.attach(created.session_id))
    }

    /// Wraps an existing session id without contacting the remote end.
    pub fn attach(&self, session_id: impl Into<String>) -> WebDriverSession {
        WebDriverSession {
            http: self.http.clone(),
            base: format!("{}/session/{}", self.endpoint, session_id.into()),
            poll_interval: self.config.poll_interval,
        }
    }
}

/// One browser session. Commands are issued sequentially.
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    http: Client,
    base: String,
    poll_interval: Duration,
}

impl WebDriverSession {
    /// Session id as assigned by the remote end.
    pub fn id(&self) -> &str {
        self.base.rsplit('/').next().unwrap_or_default()
    }

    pub fn build_command(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> reqwest::RequestBuilder {
        let url = if path.is_empty() {
            self.base.clone()
        } else {
            format!("{}/{}", self.base, path.trim_start_matches('/'))
        };
        build_command(&self.http, method, url, body)
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, WebDriverError> {
        send_command(self.build_command(method, path, body)).await
    }

    pub async fn navigate(&self, url: &str) -> Result<(), WebDriverError> {
        self.command(Method::POST, "url", Some(&json!({ "url": url })))
            .await
            .map(drop)
    }

    pub async fn current_url(&self) -> Result<String, WebDriverError> {
        let value = self.command(Method::GET, "url", None).await?;
        expect_string(value, "current url")
    }

    pub async fn refresh(&self) -> Result<(), WebDriverError> {
        self.command(Method::POST, "refresh", Some(&json!({})))
            .await
            .map(drop)
    }

    /// All elements matching `selector`; empty when nothing matches.
    pub async fn find_elements(&self, selector: &str) -> Result<Vec<ElementRef>, WebDriverError> {
        let value = self
            .command(Method::POST, "elements", Some(&css_locator(selector)))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// First element matching `selector`, if any.
    pub async fn find_element(&self, selector: &str) -> Result<Option<ElementRef>, WebDriverError> {
        match self
            .command(Method::POST, "element", Some(&css_locator(selector)))
            .await
        {
            Ok(value) => Ok(Some(serde_json::from_value(value)?)),
            Err(error) if error.is_no_such_element() => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Polls `find_elements` until something matches or `timeout` elapses.
    ///
    /// Returns an empty list at the deadline rather than an error.
    pub async fn wait_for_elements(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<ElementRef>, WebDriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            let found = self.find_elements(selector).await?;
            if !found.is_empty() {
                return Ok(found);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    pub async fn click(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        let path = format!("element/{}/click", element.id());
        self.command(Method::POST, &path, Some(&json!({})))
            .await
            .map(drop)
    }

    pub async fn element_text(&self, element: &ElementRef) -> Result<String, WebDriverError> {
        let path = format!("element/{}/text", element.id());
        let value = self.command(Method::GET, &path, None).await?;
        expect_string(value, "element text")
    }

    pub async fn element_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, WebDriverError> {
        let path = format!("element/{}/attribute/{name}", element.id());
        match self.command(Method::GET, &path, None).await? {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(text)),
            other => Ok(Some(other.to_string())),
        }
    }

    /// Types `text` into `element`; see [`crate::keys`] for special keys.
    pub async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), WebDriverError> {
        let path = format!("element/{}/value", element.id());
        self.command(Method::POST, &path, Some(&json!({ "text": text })))
            .await
            .map(drop)
    }

    pub async fn execute_sync(&self, script: &str, args: &[Value]) -> Result<Value, WebDriverError> {
        self.command(Method::POST, "execute/sync", Some(&script_body(script, args)))
            .await
    }

    pub async fn get_cookies(&self) -> Result<Vec<Cookie>, WebDriverError> {
        let value = self.command(Method::GET, "cookie", None).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn add_cookie(&self, cookie: &Cookie) -> Result<(), WebDriverError> {
        self.command(Method::POST, "cookie", Some(&json!({ "cookie": cookie })))
            .await
            .map(drop)
    }

    /// Ends the session and closes its browser windows.
    pub async fn delete(&self) -> Result<(), WebDriverError> {
        self.command(Method::DELETE, "", None).await.map(drop)
    }
}

fn build_command(
    http: &Client,
    method: Method,
    url: String,
    body: Option<&Value>,
) -> reqwest::RequestBuilder {
    let request = http
        .request(method, url)
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    match body {
        Some(body) => request.json(body),
        None => request,
    }
}

/// Sends a command and unwraps the `value` member of the response.
async fn send_command(request: reqwest::RequestBuilder) -> Result<Value, WebDriverError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(WebDriverError::from_response(status, &body));
    }

    let mut envelope: Value = serde_json::from_str(&body)?;
    match envelope.get_mut("value") {
        Some(value) => Ok(value.take()),
        None => Err(WebDriverError::UnexpectedResponse(format!(
            "response has no `value` member: {body}"
        ))),
    }
}

fn expect_string(value: Value, what: &str) -> Result<String, WebDriverError> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(WebDriverError::UnexpectedResponse(format!(
            "expected {what} to be a string, got {other}"
        ))),
    }
}

fn normalize_endpoint(endpoint: &str) -> Result<String, WebDriverError> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed)
        .map_err(|error| WebDriverError::InvalidEndpoint(format!("{trimmed}: {error}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(WebDriverError::InvalidEndpoint(format!(
            "{trimmed}: scheme must be http or https"
        )));
    }
    Ok(trimmed.to_string())
}

//! WhatsApp Web adapter over a W3C WebDriver session.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::runtime::Runtime;
use tracing::{debug, warn};
use webdriver_api::{
    keys, BrowserOptions, ElementRef, WebDriverClient, WebDriverConfig, WebDriverError,
    WebDriverSession,
};

use crate::error::UiError;
use crate::store::SessionState;
use crate::ui::ChatUi;

pub const WHATSAPP_WEB_URL: &str = "https://web.whatsapp.com";

/// Present once the chat list has rendered.
pub const READY_MARKER: &str = "span[title]";

/// Title spans of every listed conversation.
pub const CONVERSATION_TITLES: &str = "div[role='row'] span[title]";

pub const INPUT_LOCATORS: [&str; 4] = [
    "div[title='Type a message']",
    "div[contenteditable='true'][data-tab='10']",
    "div[contenteditable='true'][data-tab='1']",
    "div[contenteditable='true']",
];

const CAPTURE_STORAGE_SCRIPT: &str = "const out = {}; \
for (let i = 0; i < window.localStorage.length; i++) { \
const key = window.localStorage.key(i); out[key] = window.localStorage.getItem(key); } \
return out;";

const RESTORE_STORAGE_SCRIPT: &str = "for (const [key, value] of Object.entries(arguments[0])) { \
window.localStorage.setItem(key, value); } return null;";

const INSERT_TEXT_SCRIPT: &str = "arguments[0].focus(); \
document.execCommand('insertText', false, arguments[1]); return null;";

/// Where and how to open WhatsApp Web.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhatsAppOptions {
    pub app_url: String,
    pub driver: WebDriverConfig,
    pub browser: BrowserOptions,
}

impl Default for WhatsAppOptions {
    fn default() -> Self {
        Self {
            app_url: WHATSAPP_WEB_URL.to_string(),
            driver: WebDriverConfig::default(),
            browser: BrowserOptions::default(),
        }
    }
}

/// [`ChatUi`] implementation that drives WhatsApp Web through WebDriver.
pub struct WhatsAppWeb {
    runtime: Runtime,
    client: WebDriverClient,
    app_url: String,
    browser: BrowserOptions,
    session: Option<WebDriverSession>,
    rows: Vec<ElementRef>,
    input: Option<(String, ElementRef)>,
}

impl WhatsAppWeb {
    pub fn new(options: WhatsAppOptions) -> Result<Self, UiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| UiError::new(format!("failed to initialize tokio runtime: {error}")))?;
        let client = WebDriverClient::new(options.driver)?;
        Ok(Self {
            runtime,
            client,
            app_url: options.app_url,
            browser: options.browser,
            session: None,
            rows: Vec::new(),
            input: None,
        })
    }

    fn session(&self) -> Result<&WebDriverSession, UiError> {
        self.session
            .as_ref()
            .ok_or_else(|| UiError::new("browser is not running"))
    }
}

impl ChatUi for WhatsAppWeb {
    fn launch(&mut self, state: Option<&SessionState>) -> Result<(), UiError> {
        if self.session.is_some() {
            self.close()?;
        }
        let session = self
            .runtime
            .block_on(self.client.new_session(&self.browser))?;
        debug!(session = session.id(), "browser session started");
        self.session = Some(session);

        let session = self.session()?;
        self.runtime.block_on(async {
            session.navigate(&self.app_url).await?;
            if let Some(state) = state {
                for cookie in &state.cookies {
                    if let Err(error) = session.add_cookie(cookie).await {
                        warn!(cookie = %cookie.name, %error, "cookie was not restored");
                    }
                }
                if !state.local_storage.is_empty() {
                    session
                        .execute_sync(RESTORE_STORAGE_SCRIPT, &[json!(state.local_storage)])
                        .await?;
                }
                session.refresh().await?;
            }
            Ok::<(), WebDriverError>(())
        })?;
        Ok(())
    }

    fn wait_until_ready(&mut self, timeout: Duration) -> Result<bool, UiError> {
        let session = self.session()?;
        let found = self
            .runtime
            .block_on(session.wait_for_elements(READY_MARKER, timeout))?;
        Ok(!found.is_empty())
    }

    fn capture_state(&mut self) -> Result<SessionState, UiError> {
        let session = self.session()?;
        let (cookies, storage) = self.runtime.block_on(async {
            let cookies = session.get_cookies().await?;
            let storage = session.execute_sync(CAPTURE_STORAGE_SCRIPT, &[]).await?;
            Ok::<_, WebDriverError>((cookies, storage))
        })?;
        let local_storage = decode_storage(storage)?;
        SessionState::captured_now(self.app_url.clone(), cookies, local_storage)
            .map_err(|error| UiError::new(error.to_string()))
    }

    fn open_conversation(&mut self, title: &str, timeout: Duration) -> Result<bool, UiError> {
        let session = self.session()?;
        let selector = exact_title_selector(title);
        let opened = self.runtime.block_on(async {
            let found = session.wait_for_elements(&selector, timeout).await?;
            match found.first() {
                Some(element) => session.click(element).await.map(|()| true),
                None => Ok(false),
            }
        })?;
        Ok(opened)
    }

    fn conversation_titles(&mut self) -> Result<Vec<String>, UiError> {
        let session = self.session()?;
        let (rows, titles) = self.runtime.block_on(async {
            let rows = session.find_elements(CONVERSATION_TITLES).await?;
            let mut titles = Vec::with_capacity(rows.len());
            for row in &rows {
                titles.push(
                    session
                        .element_attribute(row, "title")
                        .await?
                        .unwrap_or_default(),
                );
            }
            Ok::<_, WebDriverError>((rows, titles))
        })?;
        self.rows = rows;
        Ok(titles)
    }

    fn open_conversation_at(&mut self, index: usize) -> Result<(), UiError> {
        let row = self.rows.get(index).cloned().ok_or_else(|| {
            UiError::new(format!(
                "conversation entry {index} is not in the last listing of {}",
                self.rows.len()
            ))
        })?;
        let session = self.session()?;
        self.runtime.block_on(session.click(&row))?;
        Ok(())
    }

    fn input_locators(&self) -> Vec<String> {
        INPUT_LOCATORS.iter().map(|locator| locator.to_string()).collect()
    }

    fn has_input(&mut self, locator: &str) -> Result<bool, UiError> {
        let session = self.session()?;
        let found = self.runtime.block_on(session.find_element(locator))?;
        Ok(match found {
            Some(element) => {
                self.input = Some((locator.to_string(), element));
                true
            }
            None => false,
        })
    }

    fn submit_text(&mut self, locator: &str, text: &str) -> Result<(), UiError> {
        let cached = match &self.input {
            Some((cached_locator, element)) if cached_locator == locator => Some(element.clone()),
            _ => None,
        };
        let session = self.session()?;
        let element = self.runtime.block_on(async {
            let element = focus_input(session, locator, cached).await?;
            session
                .execute_sync(
                    INSERT_TEXT_SCRIPT,
                    &[serde_json::to_value(&element)?, Value::String(text.to_string())],
                )
                .await?;
            session.send_keys(&element, keys::ENTER).await?;
            Ok::<_, WebDriverError>(element)
        })?;
        self.input = Some((locator.to_string(), element));
        Ok(())
    }

    fn close(&mut self) -> Result<(), UiError> {
        self.rows.clear();
        self.input = None;
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        self.runtime.block_on(session.delete())?;
        debug!(session = session.id(), "browser session closed");
        Ok(())
    }
}

impl Drop for WhatsAppWeb {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!(%error, "browser session was not closed cleanly");
        }
    }
}

/// Element lookup and focus for the message input.
trait InputTarget {
    async fn find_input(&self, locator: &str) -> Result<Option<ElementRef>, WebDriverError>;

    async fn focus(&self, element: &ElementRef) -> Result<(), WebDriverError>;
}

impl InputTarget for WebDriverSession {
    async fn find_input(&self, locator: &str) -> Result<Option<ElementRef>, WebDriverError> {
        self.find_element(locator).await
    }

    async fn focus(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        self.click(element).await
    }
}

/// Focuses the input, locating it again once if the cached reference went stale.
/// Only the lookup is repeated; nothing has been typed at this point.
async fn focus_input<T: InputTarget>(
    target: &T,
    locator: &str,
    cached: Option<ElementRef>,
) -> Result<ElementRef, WebDriverError> {
    if let Some(element) = cached {
        match target.focus(&element).await {
            Ok(()) => return Ok(element),
            Err(error) if error.is_stale_element() => {
                debug!(locator, "message input went stale; locating it again");
            }
            Err(error) => return Err(error),
        }
    }
    let element = target
        .find_input(locator)
        .await?
        .ok_or_else(|| WebDriverError::UnexpectedResponse(format!("input {locator} disappeared")))?;
    target.focus(&element).await?;
    Ok(element)
}

/// CSS selector matching a conversation title exactly.
pub fn exact_title_selector(title: &str) -> String {
    format!("span[title={}]", css_string(title))
}

/// Quotes `value` as a single-quoted CSS string.
fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' | '\'' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

fn decode_storage(value: Value) -> Result<BTreeMap<String, String>, UiError> {
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(entries) => Ok(entries
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(text) => (key, text),
                other => (key, other.to_string()),
            })
            .collect()),
        other => Err(UiError::new(format!(
            "local storage snapshot is not an object: {other}"
        ))),
    }
}

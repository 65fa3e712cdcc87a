use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::BrowserOptions;

/// JSON key identifying a web element reference.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Normalized key code points for `Element Send Keys`.
pub mod keys {
    pub const ENTER: &str = "\u{E007}";
}

/// Opaque reference to a DOM element inside one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    id: String,
}

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// A browser cookie as exchanged by the cookie commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            secure: None,
            http_only: None,
            expiry: None,
            same_site: None,
        }
    }
}

/// Body of `New Session` for Chrome.
pub fn new_session_body(options: &BrowserOptions) -> Value {
    let mut chrome = json!({ "args": options.chrome_args() });
    if let Some(binary) = &options.binary {
        chrome["binary"] = Value::String(binary.display().to_string());
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": chrome,
            }
        }
    })
}

/// Body of `Find Elements` using a CSS selector.
pub fn css_locator(selector: &str) -> Value {
    json!({ "using": "css selector", "value": selector })
}

/// Body of `Execute Script`.
pub fn script_body(script: &str, args: &[Value]) -> Value {
    json!({ "script": script, "args": args })
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewSessionValue {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

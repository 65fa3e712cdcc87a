//! Minimal W3C WebDriver client over JSON/HTTP.
//!
//! Covers the commands a chat-delivery driver needs: sessions, navigation,
//! CSS element lookup, clicks, text, synchronous scripts, key input and
//! cookies. Works against any W3C endpoint such as `chromedriver`.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;

pub use client::{WebDriverClient, WebDriverSession};
pub use config::{BrowserOptions, WebDriverConfig, DEFAULT_WEBDRIVER_URL};
pub use error::WebDriverError;
pub use payload::{keys, Cookie, ElementRef, ELEMENT_KEY};

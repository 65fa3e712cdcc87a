//! JSON run configuration.
//!
//! Secrets stay out of the file: it names the environment variables that
//! hold them.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chat_session::{ChatSessionConfig, SessionStore, WhatsAppOptions};
use mom_relay::DEFAULT_MAX_CHUNK_LEN;
use serde::Deserialize;
use thiserror::Error;
use webdriver_api::{BrowserOptions, WebDriverConfig, DEFAULT_WEBDRIVER_URL};

pub const DEFAULT_CONFIG_FILE: &str = "mom_relay.json";
pub const DEFAULT_OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_SHEETS_TOKEN_ENV: &str = "GOOGLE_SHEETS_ACCESS_TOKEN";
pub const DEFAULT_SESSION_STORE: &str = "wa_state.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error while reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    #[serde(default)]
    pub sheet: SheetSection,
    #[serde(default)]
    pub rewrite: RewriteSection,
    #[serde(default)]
    pub delivery: DeliverySection,
    #[serde(default)]
    pub browser: BrowserSection,
    /// Directory receiving the `MoM_*.md` artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetSection {
    pub spreadsheet_id: Option<String>,
    /// A1 range or sheet name; empty means the first sheet.
    pub range: String,
    /// Saved `spreadsheets.get` response used instead of the API.
    pub grid_file: Option<PathBuf>,
    pub access_token_env: String,
    pub api_key_env: Option<String>,
    /// Service-account JSON key; exchanged for a read-only Sheets token.
    pub service_account_file: Option<PathBuf>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SheetSection {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            range: String::new(),
            grid_file: None,
            access_token_env: DEFAULT_SHEETS_TOKEN_ENV.to_string(),
            api_key_env: None,
            service_account_file: None,
            base_url: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteBackend {
    Openai,
    Passthrough,
    /// Scripted echo provider; output equals input.
    Mock,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteSection {
    pub provider: RewriteBackend,
    pub model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub system_instructions: Option<String>,
    pub layout_instructions: Option<String>,
}

impl Default for RewriteSection {
    fn default() -> Self {
        Self {
            provider: RewriteBackend::Openai,
            model: rewrite_provider_openai::DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_OPENAI_KEY_ENV.to_string(),
            base_url: None,
            temperature: rewrite_provider_openai::DEFAULT_TEMPERATURE,
            max_tokens: rewrite_provider_openai::DEFAULT_MAX_TOKENS,
            timeout_secs: 60,
            max_retries: 3,
            system_instructions: None,
            layout_instructions: None,
        }
    }
}

impl RewriteSection {
    /// API key from the configured environment variable, if set and non-blank.
    pub fn api_key(&self) -> Option<String> {
        env_secret(&self.api_key_env)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeliverySection {
    pub conversation: String,
    pub max_chunk_len: usize,
    pub settle_delay_ms: u64,
    pub auth_timeout_secs: u64,
    pub ready_timeout_secs: u64,
    pub conversation_timeout_secs: u64,
    pub session_store: PathBuf,
    pub fallback_to_fresh_login: bool,
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self {
            conversation: String::new(),
            max_chunk_len: DEFAULT_MAX_CHUNK_LEN,
            settle_delay_ms: 800,
            auth_timeout_secs: 120,
            ready_timeout_secs: 30,
            conversation_timeout_secs: 15,
            session_store: PathBuf::from(DEFAULT_SESSION_STORE),
            fallback_to_fresh_login: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserSection {
    pub webdriver_url: String,
    pub app_url: String,
    pub headless: bool,
    /// Chrome profile directory kept between runs.
    pub profile_dir: Option<PathBuf>,
    pub binary: Option<PathBuf>,
    pub poll_interval_ms: u64,
    pub command_timeout_secs: u64,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            app_url: chat_session::whatsapp::WHATSAPP_WEB_URL.to_string(),
            headless: false,
            profile_dir: None,
            binary: None,
            poll_interval_ms: 250,
            command_timeout_secs: 60,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            sheet: SheetSection::default(),
            rewrite: RewriteSection::default(),
            delivery: DeliverySection::default(),
            browser: BrowserSection::default(),
            output_dir: default_output_dir(),
        }
    }
}

impl RelayConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rejects settings that cannot produce a delivery.
    pub fn validate(&self, dry_run: bool) -> Result<(), ConfigError> {
        let has_sheet = self
            .sheet
            .spreadsheet_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if !has_sheet && self.sheet.grid_file.is_none() {
            return invalid("sheet needs either spreadsheet_id or grid_file");
        }
        if self.delivery.max_chunk_len == 0 {
            return invalid("delivery.max_chunk_len must be at least 1");
        }
        if !dry_run && self.delivery.conversation.trim().is_empty() {
            return invalid("delivery.conversation must name the target chat");
        }
        for (name, value) in [
            ("delivery.auth_timeout_secs", self.delivery.auth_timeout_secs),
            ("delivery.ready_timeout_secs", self.delivery.ready_timeout_secs),
            (
                "delivery.conversation_timeout_secs",
                self.delivery.conversation_timeout_secs,
            ),
            ("browser.poll_interval_ms", self.browser.poll_interval_ms),
        ] {
            if value == 0 {
                return invalid(&format!("{name} must be greater than zero"));
            }
        }
        if self.rewrite.model.trim().is_empty() {
            return invalid("rewrite.model must not be empty");
        }
        Ok(())
    }

    pub fn chat_session_config(&self) -> ChatSessionConfig {
        let delivery = &self.delivery;
        ChatSessionConfig::new(delivery.conversation.trim())
            .with_auth_timeout(Duration::from_secs(delivery.auth_timeout_secs))
            .with_ready_timeout(Duration::from_secs(delivery.ready_timeout_secs))
            .with_conversation_timeout(Duration::from_secs(delivery.conversation_timeout_secs))
            .with_settle_delay(Duration::from_millis(delivery.settle_delay_ms))
            .with_fallback_to_fresh_login(delivery.fallback_to_fresh_login)
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.delivery.session_store.clone())
    }

    pub fn whatsapp_options(&self) -> WhatsAppOptions {
        let browser = &self.browser;
        let mut driver = WebDriverConfig::new(browser.webdriver_url.clone())
            .with_poll_interval(Duration::from_millis(browser.poll_interval_ms));
        if browser.command_timeout_secs > 0 {
            driver = driver.with_timeout(Duration::from_secs(browser.command_timeout_secs));
        }

        let mut options = BrowserOptions::default().headless(browser.headless);
        if let Some(dir) = &browser.profile_dir {
            options = options.with_user_data_dir(dir.clone());
        }
        if let Some(binary) = &browser.binary {
            options = options.with_binary(binary.clone());
        }

        WhatsAppOptions {
            app_url: browser.app_url.clone(),
            driver,
            browser: options,
        }
    }
}

fn invalid(message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(message.to_string()))
}

/// Reads a secret from `var`, treating blank values as unset.
pub fn env_secret(var: &str) -> Option<String> {
    if var.trim().is_empty() {
        return None;
    }
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

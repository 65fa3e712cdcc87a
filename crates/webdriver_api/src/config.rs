use std::path::PathBuf;
use std::time::Duration;

/// Default `chromedriver` listen address.
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Poll interval used by element waits.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Transport configuration for a WebDriver endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebDriverConfig {
    pub endpoint: String,
    /// Optional per-command HTTP timeout.
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WEBDRIVER_URL.to_string(),
            timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WebDriverConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Browser launch options folded into the new-session capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserOptions {
    pub headless: bool,
    /// Chrome profile directory (`--user-data-dir`); keeps IndexedDB logins.
    pub user_data_dir: Option<PathBuf>,
    pub binary: Option<PathBuf>,
    pub window_size: Option<(u32, u32)>,
    pub extra_args: Vec<String>,
}

impl BrowserOptions {
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = Some((width, height));
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Chrome command-line arguments in launch order.
    pub fn chrome_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.headless {
            args.push("--headless=new".to_string());
        }
        if let Some(dir) = &self.user_data_dir {
            args.push(format!("--user-data-dir={}", dir.display()));
        }
        if let Some((width, height)) = self.window_size {
            args.push(format!("--window-size={width},{height}"));
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

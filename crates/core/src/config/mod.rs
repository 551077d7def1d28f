//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (URL2MD_*)
//! 2. TOML config file (if URL2MD_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Desktop Chrome user agent sent by both the direct fetch and the browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Environment variable overriding the browser executable path.
pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (URL2MD_*)
/// 2. TOML config file (if URL2MD_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// User-Agent string for HTTP requests and the browser.
    ///
    /// Set via URL2MD_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Direct HTTP request timeout in milliseconds.
    ///
    /// Set via URL2MD_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Bodies shorter than this are treated as blocked or JS-only pages.
    #[serde(default = "default_min_content_length")]
    pub min_content_length: usize,

    /// Hard timeout for browser navigation in milliseconds.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Delay after site preparation so script-driven DOM changes can finish.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Run the browser without a window.
    #[serde(default)]
    pub headless: bool,

    /// Browser executable. `CHROME_PATH` wins over this value.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Number of simultaneous image downloads per document.
    #[serde(default = "default_image_concurrency")]
    pub image_concurrency: usize,

    /// Image responses smaller than this are counted as failures.
    #[serde(default = "default_min_image_bytes")]
    pub min_image_bytes: usize,

    /// Root directory for Markdown files and image folders.
    ///
    /// Set via URL2MD_OUTPUT_DIR environment variable.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_min_content_length() -> usize {
    500
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_settle_delay_ms() -> u64 {
    1_000
}

fn default_image_concurrency() -> usize {
    5
}

fn default_min_image_bytes() -> usize {
    100
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            min_content_length: default_min_content_length(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            headless: false,
            chrome_path: None,
            image_concurrency: default_image_concurrency(),
            min_image_bytes: default_min_image_bytes(),
            output_dir: default_output_dir(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Resolve the browser executable.
    ///
    /// `CHROME_PATH` takes precedence, then `chrome_path`, then the
    /// platform default.
    pub fn chrome_executable(&self) -> PathBuf {
        if let Ok(path) = std::env::var(CHROME_PATH_ENV)
            && !path.trim().is_empty()
        {
            return PathBuf::from(path);
        }

        self.chrome_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(platform_chrome_path(std::env::consts::OS)))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `URL2MD_`
    /// 2. TOML file from `URL2MD_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("URL2MD_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("URL2MD_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

/// Default Chrome location for an OS name as reported by `std::env::consts::OS`.
pub fn platform_chrome_path(os: &str) -> &'static str {
    match os {
        "macos" => "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "windows" => r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        "linux" => "/usr/bin/google-chrome",
        _ => "google-chrome",
    }
}

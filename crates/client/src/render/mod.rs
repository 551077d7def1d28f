//! Browser rendering for pages that need JavaScript.
//!
//! This module provides the renderer seam used by the fetch strategy and a
//! feature-gated implementation that drives Chrome/Chromium through
//! chromiumoxide.

#[cfg(feature = "render")]
mod session;

#[cfg(feature = "render")]
pub use session::{BrowserSession, SessionOptions};

use std::time::Duration;
use thiserror::Error;
use url::Url;
use url2md_core::{AppConfig, Error};

/// Errors that can occur during page rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Failed to launch or connect to browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to navigate to URL.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Site preparation script failed.
    #[error("page preparation failed: {0}")]
    Prepare(String),

    /// Failed to get page content.
    #[error("content retrieval failed: {0}")]
    ContentRetrieval(String),

    /// Timeout waiting for page to load.
    #[error("render timeout after {0}ms")]
    Timeout(u64),

    /// Browser support was not compiled in.
    #[error("rendering is disabled in this build")]
    Disabled,
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Disabled => Error::RenderDisabled,
            other => Error::RenderFailed(other.to_string()),
        }
    }
}

/// Options for rendering a page.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Navigation timeout in milliseconds (default: 30000).
    pub timeout_ms: u64,

    /// Pause after site preparation in milliseconds (default: 1000).
    pub settle_delay_ms: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { timeout_ms: 30000, settle_delay_ms: 1000 }
    }
}

impl RenderOptions {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self { timeout_ms: config.navigation_timeout_ms, settle_delay_ms: config.settle_delay_ms }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Result of rendering a page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Serialized DOM after scripts ran.
    pub html: String,

    /// Final URL after redirects.
    pub final_url: Url,

    /// Time taken to render in milliseconds.
    pub render_time_ms: u64,
}

/// Renderer trait for browser page rendering.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    /// Render a URL to HTML via the browser.
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError>;

    /// Release the underlying browser, if any. Safe to call repeatedly.
    async fn shutdown(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Renderer used when browser support is compiled out.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRenderer;

#[async_trait::async_trait]
impl Renderer for DisabledRenderer {
    async fn render(&self, _url: &Url, _opts: &RenderOptions) -> Result<RenderedPage, RenderError> {
        Err(RenderError::Disabled)
    }
}

//! Long-lived Chrome session shared by every page load in a run.
//!
//! The browser is launched on first use and relaunched if its CDP handler
//! stops. Each load opens its own tab and closes it before returning, on
//! success or failure.

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;
use url2md_core::AppConfig;

use super::{RenderError, RenderOptions, RenderedPage, Renderer};
use crate::site::SiteAdapter;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);

/// Launch parameters for the browser process.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Chrome/Chromium executable.
    pub executable: PathBuf,

    /// User agent passed on the command line.
    pub user_agent: String,

    /// Run without a window (default: false).
    pub headless: bool,
}

impl SessionOptions {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self { executable: config.chrome_executable(), user_agent: config.user_agent.clone(), headless: config.headless }
    }
}

/// A running browser and the task pumping its CDP events.
pub struct LiveBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl LiveBrowser {
    /// The handler task ends when the connection to the browser drops.
    pub fn is_connected(&self) -> bool {
        !self.handler.is_finished()
    }
}

/// Lazily launched browser owned by the pipeline for the duration of a run.
pub struct BrowserSession {
    options: SessionOptions,
    live: Mutex<Option<Arc<LiveBrowser>>>,
}

impl BrowserSession {
    pub fn new(options: SessionOptions) -> Self {
        Self { options, live: Mutex::new(None) }
    }

    pub async fn is_running(&self) -> bool {
        self.live.lock().await.as_ref().is_some_and(|live| live.is_connected())
    }

    /// Return the live browser, launching one if none exists or the
    /// current one has disconnected.
    pub async fn acquire(&self) -> Result<Arc<LiveBrowser>, RenderError> {
        let mut slot = self.live.lock().await;

        if let Some(live) = slot.as_ref() {
            if live.is_connected() {
                return Ok(live.clone());
            }
            tracing::warn!("browser disconnected, relaunching");
        }

        let live = Arc::new(self.launch().await?);
        *slot = Some(live.clone());
        Ok(live)
    }

    async fn launch(&self) -> Result<LiveBrowser, RenderError> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(&self.options.executable)
            .arg(format!("--user-agent={}", self.options.user_agent));
        if !self.options.headless {
            builder = builder.with_head();
        }

        let (browser, mut handler) = Browser::launch(builder.build().map_err(RenderError::BrowserLaunch)?)
            .await
            .map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        tracing::info!(executable = %self.options.executable.display(), headless = self.options.headless, "browser launched");

        Ok(LiveBrowser { browser, handler })
    }

    /// Load a URL in a fresh tab and return the rendered HTML.
    pub async fn load(&self, url: &Url, opts: &RenderOptions) -> Result<(String, Url), RenderError> {
        let live = self.acquire().await?;
        let page = live
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        let outcome = capture(&page, url, opts).await;

        if let Err(e) = page.close().await {
            tracing::debug!(url = %url, "failed to close tab: {e}");
        }

        outcome
    }
}

async fn capture(page: &Page, url: &Url, opts: &RenderOptions) -> Result<(String, Url), RenderError> {
    tokio::time::timeout(opts.timeout(), navigate(page, url))
        .await
        .map_err(|_| RenderError::Timeout(opts.timeout_ms))??;

    if let Some(script) = SiteAdapter::detect(url.as_str()).prepare_script() {
        page.evaluate(script)
            .await
            .map_err(|e| RenderError::Prepare(e.to_string()))?;
        tokio::time::sleep(opts.settle_delay()).await;
    }

    let html = page
        .content()
        .await
        .map_err(|e| RenderError::ContentRetrieval(e.to_string()))?;

    let final_url = page
        .url()
        .await
        .ok()
        .flatten()
        .and_then(|u| Url::parse(&u).ok())
        .unwrap_or_else(|| url.clone());

    Ok((html, final_url))
}

/// Navigate and wait for both DOM-ready and a quiet network.
async fn navigate(page: &Page, url: &Url) -> Result<(), RenderError> {
    page.goto(url.as_str())
        .await
        .map_err(|e| RenderError::Navigation(e.to_string()))?;

    while evaluate::<String>(page, "document.readyState").await? == "loading" {
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    let mut seen = evaluate::<u64>(page, "performance.getEntriesByType('resource').length").await?;
    let mut quiet_since = Instant::now();
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        let count = evaluate::<u64>(page, "performance.getEntriesByType('resource').length").await?;
        if count != seen {
            seen = count;
            quiet_since = Instant::now();
        } else if quiet_since.elapsed() >= NETWORK_QUIET_WINDOW {
            return Ok(());
        }
    }
}

async fn evaluate<T: serde::de::DeserializeOwned>(page: &Page, expression: &str) -> Result<T, RenderError> {
    page.evaluate(expression)
        .await
        .map_err(|e| RenderError::Navigation(e.to_string()))?
        .into_value()
        .map_err(|e| RenderError::Navigation(e.to_string()))
}

#[async_trait::async_trait]
impl Renderer for BrowserSession {
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError> {
        let start = Instant::now();
        let (html, final_url) = self.load(url, opts).await?;
        let render_time_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("rendered {} -> {} in {}ms ({} bytes)", url, final_url, render_time_ms, html.len());

        Ok(RenderedPage { html, final_url, render_time_ms })
    }

    async fn shutdown(&self) -> Result<(), RenderError> {
        let Some(live) = self.live.lock().await.take() else {
            return Ok(());
        };

        match Arc::try_unwrap(live) {
            Ok(mut live) => {
                live.browser
                    .close()
                    .await
                    .map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;
                live.browser.wait().await.ok();
                live.handler.abort();
                tracing::info!("browser closed");
            }
            Err(_) => tracing::warn!("browser still in use at shutdown; dropping handle"),
        }

        Ok(())
    }
}

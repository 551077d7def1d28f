//! Direct-fetch-first strategy with browser fallback.
//!
//! Special sites and `force_browser` go straight to the renderer. Everything
//! else tries a plain GET first; a failed or suspiciously short response falls
//! back to the renderer exactly once.

use std::sync::Arc;
use url::Url;
use url2md_core::{AppConfig, Error};

use super::FetchClient;
use crate::render::{RenderOptions, Renderer};
use crate::site::SiteAdapter;

/// HTML for one URL and which path produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub html: String,
    pub used_browser: bool,
}

/// Chooses between the direct HTTP path and the browser.
pub struct FetchStrategy {
    client: FetchClient,
    renderer: Arc<dyn Renderer>,
    render_options: RenderOptions,
    min_content_length: usize,
}

impl FetchStrategy {
    pub fn new(
        client: FetchClient, renderer: Arc<dyn Renderer>, render_options: RenderOptions, min_content_length: usize,
    ) -> Self {
        Self { client, renderer, render_options, min_content_length }
    }

    pub fn from_app_config(client: FetchClient, renderer: Arc<dyn Renderer>, config: &AppConfig) -> Self {
        Self::new(client, renderer, RenderOptions::from_app_config(config), config.min_content_length)
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    /// Fetch a page, recording whether the browser was used.
    ///
    /// # Errors
    ///
    /// Only browser failures surface. Direct fetch failures trigger the
    /// fallback instead.
    pub async fn fetch(&self, url: &Url, force_browser: bool) -> Result<FetchResult, Error> {
        if force_browser || SiteAdapter::detect(url.as_str()).requires_browser() {
            return self.browser_fetch(url).await;
        }

        if let Some(html) = self.direct_fetch(url).await {
            return Ok(FetchResult { html, used_browser: false });
        }

        tracing::info!(url = %url, "direct fetch failed, falling back to browser");
        self.browser_fetch(url).await
    }

    /// Plain GET. `None` on any failure or a body below the minimum length.
    async fn direct_fetch(&self, url: &Url) -> Option<String> {
        let response = match self.client.fetch(url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %url, "direct fetch error: {e}");
                return None;
            }
        };

        tracing::debug!(
            url = %response.url,
            final_url = %response.final_url,
            status = response.status.as_u16(),
            content_type = response.content_type.as_deref().unwrap_or(""),
            fetch_ms = response.fetch_ms,
            bytes = response.body.len(),
            "direct fetch"
        );

        if response.body.len() < self.min_content_length {
            tracing::debug!(
                url = %url,
                bytes = response.body.len(),
                min = self.min_content_length,
                "direct fetch body too short"
            );
            return None;
        }

        Some(response.body)
    }

    async fn browser_fetch(&self, url: &Url) -> Result<FetchResult, Error> {
        let page = self.renderer.render(url, &self.render_options).await?;
        Ok(FetchResult { html: page.html, used_browser: true })
    }
}

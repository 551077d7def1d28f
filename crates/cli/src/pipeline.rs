//! Per-URL orchestration: fetch, extract, localize images, write.
//!
//! URLs are processed one at a time against a single renderer. A failure
//! for one URL is logged and counted; the run continues with the next.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use url2md_client::{
    Extractor, FetchClient, FetchConfig, FetchStrategy, ImageLocalizer, Renderer, SiteAdapter, SiteAwareExtractor,
    canonicalize,
};
use url2md_core::{AppConfig, Error, slugify};

/// What was produced for one URL.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub path: PathBuf,
    pub title: String,
    pub used_browser: bool,
    pub downloaded: usize,
    pub failed: usize,
}

/// Totals for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: u32,
    pub failed: u32,
}

pub struct Pipeline {
    strategy: FetchStrategy,
    extractor: SiteAwareExtractor,
    localizer: ImageLocalizer,
    output_dir: PathBuf,
    force_browser: bool,
}

impl Pipeline {
    pub fn new(config: &AppConfig, renderer: Arc<dyn Renderer>, force_browser: bool) -> Result<Self, Error> {
        let client = FetchClient::new(FetchConfig::from_app_config(config))?;

        Ok(Self {
            strategy: FetchStrategy::from_app_config(client.clone(), renderer, config),
            extractor: SiteAwareExtractor,
            localizer: ImageLocalizer::from_app_config(client, config),
            output_dir: config.output_dir.clone(),
            force_browser,
        })
    }

    /// Process every URL in order, then shut the renderer down once.
    pub async fn run(&self, urls: &[String]) -> RunSummary {
        tracing::info!(count = urls.len(), output = %self.output_dir.display(), "url2md: {} URL(s)", urls.len());

        let mut summary = RunSummary::default();
        for url in urls {
            match self.process_url(url).await {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    tracing::error!(url = %url, "{e}");
                    summary.failed += 1;
                }
            }
        }

        if let Err(e) = self.strategy.renderer().shutdown().await {
            tracing::warn!("failed to shut down browser: {e}");
        }

        if urls.len() > 1 {
            tracing::info!(succeeded = summary.succeeded, failed = summary.failed, "Done: {} success, {} failed", summary.succeeded, summary.failed);
        }

        summary
    }

    /// Convert one URL into `<output_dir>/<slug>.md`.
    pub async fn process_url(&self, raw: &str) -> Result<Outcome, Error> {
        let start = Instant::now();
        let url = canonicalize(raw)?;
        tracing::info!(url = %url, "fetching");

        let fetched = self.strategy.fetch(&url, self.force_browser).await?;
        tracing::info!(
            used_browser = fetched.used_browser,
            bytes = fetched.html.len(),
            "fetched ({}, {}KB)",
            if fetched.used_browser { "browser" } else { "direct" },
            fetched.html.len() / 1024
        );

        let parsed = self
            .extractor
            .extract(&fetched.html, &url, SiteAdapter::detect(url.as_str()))?;
        tracing::info!(title = %parsed.title, images = parsed.images.len(), "parsed");
        if !parsed.author.is_empty() {
            tracing::info!(author = %parsed.author, publish_date = %parsed.publish_date, "byline");
        }

        let slug = slugify(&parsed.title);
        let localized = self
            .localizer
            .localize(&parsed.markdown, &parsed.images, &slug, &self.output_dir)
            .await?;
        if !parsed.images.is_empty() {
            tracing::info!(downloaded = localized.downloaded, failed = localized.failed, "images");
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(format!("{slug}.md"));
        tokio::fs::write(&path, &localized.markdown).await?;

        tracing::info!(path = %path.display(), elapsed_ms = start.elapsed().as_millis() as u64, "written");

        Ok(Outcome {
            path,
            title: parsed.title,
            used_browser: fetched.used_browser,
            downloaded: localized.downloaded,
            failed: localized.failed,
        })
    }
}

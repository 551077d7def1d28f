//! Image localization: download remote images and point Markdown at them.
//!
//! A fixed pool of workers claims indices from a shared cursor, so at most
//! `concurrency` downloads are in flight. Results land in a slot per input
//! index, which keeps file numbering and rewriting independent of completion
//! order. Failed images keep their remote URL in the Markdown.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinSet;
use url::Url;
use url2md_core::{AppConfig, Error};

use crate::fetch::FetchClient;
use crate::site::SiteAdapter;

/// Extensions accepted from the URL path when Content-Type is not decisive.
const KNOWN_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg"];

/// Outcome of localizing one document's images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDownloadResult {
    /// Markdown with every downloaded URL replaced by its local path.
    pub markdown: String,
    pub downloaded: usize,
    pub failed: usize,
}

/// Downloads images into `<output_root>/<slug>-images/`.
pub struct ImageLocalizer {
    client: FetchClient,
    concurrency: usize,
    min_bytes: usize,
}

impl ImageLocalizer {
    pub fn new(client: FetchClient, concurrency: usize, min_bytes: usize) -> Self {
        Self { client, concurrency: concurrency.max(1), min_bytes }
    }

    pub fn from_app_config(client: FetchClient, config: &AppConfig) -> Self {
        Self::new(client, config.image_concurrency, config.min_image_bytes)
    }

    /// Download `image_urls` and rewrite their occurrences in `markdown`.
    ///
    /// # Errors
    ///
    /// Only failing to create the image directory is an error; individual
    /// downloads that fail are counted in `failed`.
    pub async fn localize(
        &self, markdown: &str, image_urls: &[String], slug: &str, output_root: &Path,
    ) -> Result<ImageDownloadResult, Error> {
        let mut seen = HashSet::new();
        let urls: Vec<String> = image_urls.iter().filter(|u| seen.insert(u.as_str())).cloned().collect();

        if urls.is_empty() {
            return Ok(ImageDownloadResult { markdown: markdown.to_string(), downloaded: 0, failed: 0 });
        }

        let image_dir = output_root.join(format!("{slug}-images"));
        tokio::fs::create_dir_all(&image_dir).await?;

        let job = Arc::new(Job {
            client: self.client.clone(),
            urls,
            slug: slug.to_string(),
            image_dir,
            min_bytes: self.min_bytes,
            next: AtomicUsize::new(0),
        });

        let mut workers = JoinSet::new();
        for _ in 0..self.concurrency.min(job.urls.len()) {
            let job = job.clone();
            workers.spawn(async move { job.work().await });
        }

        let mut slots: Vec<Option<String>> = vec![None; job.urls.len()];
        while let Some(finished) = workers.join_next().await {
            let claimed = finished.map_err(|e| Error::Io(std::io::Error::other(e)))?;
            for (index, local) in claimed {
                slots[index] = local;
            }
        }

        let mappings: Vec<(&str, &str)> = job
            .urls
            .iter()
            .zip(&slots)
            .filter_map(|(remote, local)| local.as_deref().map(|local| (remote.as_str(), local)))
            .collect();

        let downloaded = mappings.len();
        let failed = job.urls.len() - downloaded;

        tracing::debug!(slug, downloaded, failed, "images localized");

        Ok(ImageDownloadResult { markdown: rewrite_references(markdown, &mappings), downloaded, failed })
    }
}

/// Shared state for one localization run.
struct Job {
    client: FetchClient,
    urls: Vec<String>,
    slug: String,
    image_dir: PathBuf,
    min_bytes: usize,
    next: AtomicUsize,
}

impl Job {
    /// Claim indices until none remain; returns the local path per claimed index.
    async fn work(&self) -> Vec<(usize, Option<String>)> {
        let mut claimed = Vec::new();
        loop {
            let index = self.next.fetch_add(1, Ordering::Relaxed);
            let Some(url) = self.urls.get(index) else {
                return claimed;
            };
            claimed.push((index, self.download(index, url).await));
        }
    }

    async fn download(&self, index: usize, raw: &str) -> Option<String> {
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(url = raw, "invalid image URL: {e}");
                return None;
            }
        };

        let response = match self.client.fetch_bytes(&url, SiteAdapter::image_referer(raw)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = raw, "image download failed: {e}");
                return None;
            }
        };

        if response.bytes.len() < self.min_bytes {
            tracing::debug!(url = raw, bytes = response.bytes.len(), "image body too small");
            return None;
        }

        let extension = guess_extension(&url, response.content_type.as_deref());
        let filename = format!("{}-{:02}.{}", self.slug, index + 1, extension);

        if let Err(e) = tokio::fs::write(self.image_dir.join(&filename), &response.bytes).await {
            tracing::warn!(url = raw, file = %filename, "failed to write image: {e}");
            return None;
        }

        Some(format!("./{}-images/{}", self.slug, filename))
    }
}

/// File extension (without dot) from Content-Type, then the URL path, else `jpg`.
pub fn guess_extension(url: &Url, content_type: Option<&str>) -> String {
    if let Some(content_type) = content_type {
        for ext in ["png", "gif", "webp", "svg"] {
            if content_type.contains(ext) {
                return ext.to_string();
            }
        }
    }

    Path::new(url.path())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "jpg".to_string())
}

/// Replace every literal occurrence of each remote URL with its local path.
pub fn rewrite_references(markdown: &str, mappings: &[(&str, &str)]) -> String {
    mappings
        .iter()
        .fold(markdown.to_string(), |text, (remote, local)| text.replace(remote, local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchConfig;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn localizer() -> ImageLocalizer {
        ImageLocalizer::new(FetchClient::new(FetchConfig::default()).unwrap(), 5, 100)
    }

    #[test]
    fn test_guess_extension_content_type_first() {
        let url = Url::parse("https://example.com/a.jpg").unwrap();
        assert_eq!(guess_extension(&url, Some("image/png")), "png");
        assert_eq!(guess_extension(&url, Some("image/svg+xml")), "svg");
        assert_eq!(guess_extension(&url, Some("image/webp")), "webp");
        assert_eq!(guess_extension(&url, Some("image/gif")), "gif");
    }

    #[test]
    fn test_guess_extension_from_path() {
        let url = Url::parse("https://example.com/photos/cat.JPEG?w=300").unwrap();
        assert_eq!(guess_extension(&url, Some("image/jpeg")), "jpeg");
        let url = Url::parse("https://example.com/icon.svg").unwrap();
        assert_eq!(guess_extension(&url, None), "svg");
    }

    #[test]
    fn test_guess_extension_default() {
        let url = Url::parse("https://mmbiz.qpic.cn/mmbiz_jpg/abc/640?wx_fmt=jpeg").unwrap();
        assert_eq!(guess_extension(&url, Some("application/octet-stream")), "jpg");
        let url = Url::parse("https://example.com/download.php").unwrap();
        assert_eq!(guess_extension(&url, None), "jpg");
    }

    #[test]
    fn test_rewrite_pattern_sensitive_url() {
        let remote = "https://x.com/a(1).jpg?w=2";
        let markdown = format!("![one]({remote})\n\ntext https://x.com/a(1).jpg?w=20 and ![two]({remote})");
        let rewritten = rewrite_references(&markdown, &[(remote, "./doc-images/doc-01.jpg")]);

        assert_eq!(
            rewritten,
            "![one](./doc-images/doc-01.jpg)\n\ntext ./doc-images/doc-01.jpg0 and ![two](./doc-images/doc-01.jpg)"
        );
        assert!(!rewritten.contains("a(1)"));
    }

    #[test]
    fn test_rewrite_leaves_unmapped_urls() {
        let markdown = "![a](https://e.com/a.png) ![b](https://e.com/b.png)";
        let rewritten = rewrite_references(markdown, &[("https://e.com/a.png", "./s-images/s-01.png")]);
        assert_eq!(rewritten, "![a](./s-images/s-01.png) ![b](https://e.com/b.png)");
    }

    #[tokio::test]
    async fn test_localize_empty_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let result = localizer().localize("# Doc", &[], "doc", dir.path()).await.unwrap();

        assert_eq!(result, ImageDownloadResult { markdown: "# Doc".into(), downloaded: 0, failed: 0 });
        assert!(!dir.path().join("doc-images").exists());
    }

    #[tokio::test]
    async fn test_localize_mixed_results() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ok.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(vec![1u8; 512])
            .create_async()
            .await;
        server.mock("GET", "/missing.jpg").with_status(404).create_async().await;
        server
            .mock("GET", "/tiny.gif")
            .with_status(200)
            .with_header("content-type", "image/gif")
            .with_body(vec![1u8; 10])
            .create_async()
            .await;
        server
            .mock("GET", "/photo.webp")
            .with_status(200)
            .with_body(vec![2u8; 300])
            .create_async()
            .await;

        let base = server.url();
        let urls = vec![
            format!("{base}/ok.png"),
            format!("{base}/missing.jpg"),
            format!("{base}/tiny.gif"),
            "not a url".to_string(),
            format!("{base}/photo.webp"),
            format!("{base}/ok.png"),
        ];
        let markdown = urls.iter().map(|u| format!("![]({u})")).collect::<Vec<_>>().join("\n");

        let dir = tempfile::tempdir().unwrap();
        let result = localizer().localize(&markdown, &urls, "Doc", dir.path()).await.unwrap();

        assert_eq!(result.downloaded + result.failed, 5);
        assert_eq!(result.downloaded, 2);
        assert_eq!(result.failed, 3);

        assert!(dir.path().join("Doc-images/Doc-01.png").exists());
        assert!(dir.path().join("Doc-images/Doc-05.webp").exists());
        assert!(!dir.path().join("Doc-images/Doc-02.jpg").exists());

        assert!(result.markdown.contains("![](./Doc-images/Doc-01.png)"));
        assert!(result.markdown.contains("![](./Doc-images/Doc-05.webp)"));
        assert!(result.markdown.contains(&format!("![]({base}/missing.jpg)")));
        assert!(result.markdown.contains(&format!("![]({base}/tiny.gif)")));
        assert!(!result.markdown.contains(&format!("{base}/ok.png")));
    }

    /// Serves a 256-byte PNG to every request after `delay`, recording the
    /// current and peak number of requests being handled.
    async fn slow_image_server(delay: Duration) -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let high = peak.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let (in_flight, high) = (in_flight.clone(), high.clone());
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&chunk[..n]),
                        }
                    }

                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    high.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);

                    let body = [0u8; 256];
                    let head = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{addr}"), peak)
    }

    #[tokio::test]
    async fn test_localize_caps_concurrent_downloads() {
        let (base, peak) = slow_image_server(Duration::from_millis(150)).await;
        let urls: Vec<String> = (0..12).map(|i| format!("{base}/img{i}.png")).collect();

        let dir = tempfile::tempdir().unwrap();
        let result = localizer().localize("", &urls, "batch", dir.path()).await.unwrap();

        assert_eq!((result.downloaded, result.failed), (12, 0));
        assert_eq!(peak.load(Ordering::SeqCst), 5);
        for i in 1..=12 {
            assert!(dir.path().join(format!("batch-images/batch-{i:02}.png")).exists());
        }
    }

    #[tokio::test]
    async fn test_localize_fewer_urls_than_workers() {
        let (base, peak) = slow_image_server(Duration::from_millis(50)).await;
        let urls: Vec<String> = (0..3).map(|i| format!("{base}/img{i}.png")).collect();

        let dir = tempfile::tempdir().unwrap();
        let localizer = ImageLocalizer::new(FetchClient::new(FetchConfig::default()).unwrap(), 2, 100);
        let result = localizer.localize("", &urls, "few", dir.path()).await.unwrap();

        assert_eq!(result.downloaded, 3);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_localize_wechat_cdn_referer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/mmbiz.qpic.cn/pic")
            .match_header("referer", "https://mp.weixin.qq.com/")
            .with_status(200)
            .with_body(vec![0u8; 200])
            .create_async()
            .await;

        let url = format!("{}/mmbiz.qpic.cn/pic", server.url());
        let dir = tempfile::tempdir().unwrap();
        let result = localizer().localize("", &[url], "wx", dir.path()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.downloaded, 1);
        assert!(dir.path().join("wx-images/wx-01.jpg").exists());
    }
}

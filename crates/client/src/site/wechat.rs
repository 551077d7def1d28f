//! WeChat official-account articles.
//!
//! Article images are lazy-loaded from `data-src`, the body lives in
//! `#js_content`, and the reliable title/author/timestamp are script
//! variables rather than DOM text.

use chrono::DateTime;
use regex::Regex;
use std::sync::LazyLock;

use super::SiteMeta;

pub const CONTENT_SELECTOR: &str = "#js_content";
pub const TITLE_SELECTOR: &str = "#activity-name";

const HOST: &str = "mp.weixin.qq.com";
const IMAGE_CDN_HOST: &str = "mmbiz.qpic.cn";
const REFERER: &str = "https://mp.weixin.qq.com/";

/// Copies every `data-src` into `src` so the captured HTML carries real image URLs.
pub const PREPARE_SCRIPT: &str = r#"(() => {
  let swapped = 0;
  document.querySelectorAll("img[data-src]").forEach((img) => {
    const dataSrc = img.getAttribute("data-src");
    if (dataSrc) {
      img.setAttribute("src", dataSrc);
      swapped += 1;
    }
  });
  return swapped;
})()"#;

static TITLE_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"var\s+msg_title\s*=\s*"([^"]*)""#).expect("invalid regex"),
        Regex::new(r#"var\s+msg_title\s*=\s*'([^']*)'"#).expect("invalid regex"),
    ]
});

static AUTHOR_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"var\s+nickname\s*=\s*"([^"]*)""#).expect("invalid regex"),
        Regex::new(r#"var\s+nickname\s*=\s*'([^']*)'"#).expect("invalid regex"),
    ]
});

static TIME_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"var\s+ct\s*=\s*"(\d+)""#).expect("invalid regex"),
        Regex::new(r#"var\s+create_time\s*=\s*"(\d+)""#).expect("invalid regex"),
    ]
});

pub fn is_wechat_url(url: &str) -> bool {
    url.contains(HOST)
}

pub fn image_referer(image_url: &str) -> Option<&'static str> {
    image_url.contains(IMAGE_CDN_HOST).then_some(REFERER)
}

/// First capture of the first pattern that matches.
fn first_capture<'h>(patterns: &[Regex], html: &'h str) -> Option<&'h str> {
    patterns
        .iter()
        .find_map(|re| re.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Unix seconds to a UTC calendar date. Zero and out-of-range values yield nothing.
fn epoch_to_date(secs: &str) -> Option<String> {
    let secs: i64 = secs.parse().ok().filter(|s| *s != 0)?;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

pub fn extract_meta(html: &str) -> SiteMeta {
    let title = first_capture(&*TITLE_PATTERNS, html).map(str::trim).unwrap_or_default();
    let author = first_capture(&*AUTHOR_PATTERNS, html).map(str::trim).unwrap_or_default();
    let publish_date = first_capture(&*TIME_PATTERNS, html)
        .and_then(epoch_to_date)
        .unwrap_or_default();

    SiteMeta { title: title.to_string(), author: author.to_string(), publish_date }
}

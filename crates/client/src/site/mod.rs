//! Site adapters for publishing platforms with non-standard markup.
//!
//! Each adapter answers three questions about a page: does a URL belong to
//! it, what must run inside a rendered page before capture, and what metadata
//! can be read from the raw HTML. Pages that no special adapter claims use
//! [`SiteAdapter::Generic`].

pub mod wechat;

/// Metadata read from page scripts. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteMeta {
    pub title: String,
    pub author: String,
    /// `YYYY-MM-DD` in UTC, or empty.
    pub publish_date: String,
}

/// Closed set of site variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteAdapter {
    /// WeChat official-account articles (`mp.weixin.qq.com`).
    WeChat,
    /// Any other page.
    Generic,
}

impl SiteAdapter {
    /// Adapters consulted by [`SiteAdapter::detect`], in priority order.
    const SPECIAL: &'static [SiteAdapter] = &[SiteAdapter::WeChat];

    /// Pick the adapter for a URL.
    pub fn detect(url: &str) -> Self {
        Self::SPECIAL
            .iter()
            .copied()
            .find(|adapter| adapter.matches(url))
            .unwrap_or(SiteAdapter::Generic)
    }

    /// Whether this adapter claims the URL.
    pub fn matches(&self, url: &str) -> bool {
        match self {
            SiteAdapter::WeChat => wechat::is_wechat_url(url),
            SiteAdapter::Generic => true,
        }
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, SiteAdapter::Generic)
    }

    /// Pages for this site can only be captured through the browser.
    pub fn requires_browser(&self) -> bool {
        !self.is_generic()
    }

    /// Script evaluated in the rendered page before its HTML is captured.
    pub fn prepare_script(&self) -> Option<&'static str> {
        match self {
            SiteAdapter::WeChat => Some(wechat::PREPARE_SCRIPT),
            SiteAdapter::Generic => None,
        }
    }

    /// Read title, author and publish date from embedded script variables.
    pub fn extract_meta(&self, html: &str) -> SiteMeta {
        match self {
            SiteAdapter::WeChat => wechat::extract_meta(html),
            SiteAdapter::Generic => SiteMeta::default(),
        }
    }

    /// Container holding the article body, if the site has a fixed one.
    pub fn content_selector(&self) -> Option<&'static str> {
        match self {
            SiteAdapter::WeChat => Some(wechat::CONTENT_SELECTOR),
            SiteAdapter::Generic => None,
        }
    }

    /// Element whose text is the article title, if the site has one.
    pub fn title_selector(&self) -> Option<&'static str> {
        match self {
            SiteAdapter::WeChat => Some(wechat::TITLE_SELECTOR),
            SiteAdapter::Generic => None,
        }
    }

    /// Referer required by image CDNs that reject hotlinked requests.
    pub fn image_referer(image_url: &str) -> Option<&'static str> {
        Self::SPECIAL.iter().find_map(|adapter| match adapter {
            SiteAdapter::WeChat => wechat::image_referer(image_url),
            SiteAdapter::Generic => None,
        })
    }
}

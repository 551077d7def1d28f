//! Acquisition-and-normalization pipeline for url2md.
//!
//! This crate fetches pages (directly or through a browser), extracts their
//! main content as Markdown, and localizes the images they reference.

pub mod extract;
pub mod fetch;
pub mod images;
pub mod render;
pub mod site;

pub use extract::{Extractor, MarkdownConverter, ParseResult, SiteAwareExtractor, extract_page};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, FetchResult, FetchStrategy, UrlError, canonicalize};
pub use images::{ImageDownloadResult, ImageLocalizer};
#[cfg(feature = "render")]
pub use render::{BrowserSession, SessionOptions};
pub use render::{DisabledRenderer, RenderError, RenderOptions, RenderedPage, Renderer};
pub use site::{SiteAdapter, SiteMeta};

//! Site-aware content extraction and Markdown conversion.
//!
//! ### Content Region
//! - Special sites use their fixed container (e.g. `#js_content`).
//! - Generic pages use the first non-empty `article`, then `main`, then `body`.
//!
//! ### Cleaning
//! - Noise selectors (scripts, chrome, ads, comments, sidebars) are dropped.
//! - Links without visible text are dropped entirely.
//!
//! ### Images
//! - Collected from the content region only, lazy-load source first.
//! - Resolved to absolute URLs and written into the Markdown in that form.
//!
//! ### Output
//! - An H1 title heads every document; special sites add an author/date line.

mod clean;
pub mod markdown;

pub use markdown::MarkdownConverter;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;
use url2md_core::Error;

use crate::fetch::resolve_reference;
use crate::site::SiteAdapter;
use clean::{CleanRegion, clean_region, is_removed};

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("invalid selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("invalid selector"));
static BASE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("base[href]").expect("invalid selector"));
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("invalid selector"));
static GENERIC_REGIONS: LazyLock<[Selector; 2]> = LazyLock::new(|| {
    [
        Selector::parse("article").expect("invalid selector"),
        Selector::parse("main").expect("invalid selector"),
    ]
});
static LEADING_H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#\s+(.+)").expect("invalid regex"));

/// Result of content extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    /// Final Markdown, title heading included.
    pub markdown: String,
    pub title: String,
    /// Absolute image URLs in first-seen order, without duplicates.
    pub images: Vec<String>,
    /// Empty when the site exposes no author.
    pub author: String,
    /// `YYYY-MM-DD` or empty.
    pub publish_date: String,
}

/// Stable extractor trait for content extraction.
pub trait Extractor: Send + Sync {
    /// Extract the main content of `html` fetched from `url`.
    fn extract(&self, html: &str, url: &Url, adapter: SiteAdapter) -> Result<ParseResult, Error>;
}

/// Extractor that dispatches on the site adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct SiteAwareExtractor;

impl Extractor for SiteAwareExtractor {
    fn extract(&self, html: &str, url: &Url, adapter: SiteAdapter) -> Result<ParseResult, Error> {
        let document = Html::parse_document(html);
        let base = document_base(&document, url);
        let converter = MarkdownConverter::new();

        match adapter {
            SiteAdapter::Generic => extract_generic(&document, &base, &converter),
            special => extract_special(html, &document, &base, special, &converter),
        }
    }
}

/// Extract using the adapter detected from `url`.
pub fn extract_page(html: &str, url: &Url) -> Result<ParseResult, Error> {
    SiteAwareExtractor.extract(html, url, SiteAdapter::detect(url.as_str()))
}

fn extract_special(
    html: &str, document: &Html, base: &Url, adapter: SiteAdapter, converter: &MarkdownConverter,
) -> Result<ParseResult, Error> {
    let meta = adapter.extract_meta(html);

    let title = Some(meta.title.clone())
        .filter(|t| !t.is_empty())
        .or_else(|| adapter.title_selector().and_then(|sel| first_text(document, sel)))
        .or_else(|| select_text(document, &TITLE))
        .unwrap_or_default();

    let region = adapter
        .content_selector()
        .and_then(|sel| Selector::parse(sel).ok())
        .and_then(|sel| document.select(&sel).next())
        .map(|element| clean_region(element, base))
        .unwrap_or_default();

    let body = converter.convert_region(&region)?;
    let byline = [meta.author.as_str(), meta.publish_date.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");

    let mut markdown = format!("# {title}\n\n");
    if !byline.is_empty() {
        markdown.push_str(&format!("> {byline}\n\n"));
    }
    markdown.push_str(&body);

    Ok(ParseResult {
        markdown,
        title,
        images: region.images,
        author: meta.author,
        publish_date: meta.publish_date,
    })
}

fn extract_generic(document: &Html, base: &Url, converter: &MarkdownConverter) -> Result<ParseResult, Error> {
    let title = select_text(document, &TITLE)
        .or_else(|| select_text(document, &H1))
        .unwrap_or_else(|| "Untitled".to_string());

    let region = generic_region(document, base);
    let body = converter.convert_region(&region)?;

    let starts_with_title = LEADING_H1
        .captures(&body)
        .and_then(|caps| caps.get(1))
        .is_some_and(|heading| heading.as_str().trim() == title);

    let markdown = if starts_with_title { body } else { format!("# {title}\n\n{body}") };

    Ok(ParseResult { markdown, title, images: region.images, author: String::new(), publish_date: String::new() })
}

/// First non-empty `article`, then `main`, falling back to `body`.
fn generic_region(document: &Html, base: &Url) -> CleanRegion {
    for selector in GENERIC_REGIONS.iter() {
        let candidate = document
            .select(selector)
            .find(|element| !is_removed(element))
            .map(|element| clean_region(element, base));

        if let Some(region) = candidate.filter(|r| r.has_content) {
            return region;
        }
    }

    document
        .select(&BODY)
        .next()
        .map(|body| clean_region(body, base))
        .unwrap_or_default()
}

/// Page URL adjusted by a `<base href>`, if the document declares one.
fn document_base(document: &Html, url: &Url) -> Url {
    document
        .select(&BASE)
        .next()
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| resolve_reference(url, href))
        .unwrap_or_else(|| url.clone())
}

fn select_text(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).next().map(element_text).filter(|t| !t.is_empty())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    select_text(document, &selector)
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

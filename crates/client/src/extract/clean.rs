//! Cleaned re-serialization of a content region.
//!
//! Instead of mutating the parsed tree, the region is walked once and written
//! back out as HTML with noise elements and text-less links left out. The same
//! walk records image URLs in document order and lifts tables, image sources
//! and GFM-only constructs out into placeholders that the Markdown stage
//! fills in.

use scraper::{ElementRef, Node, Selector};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::LazyLock;
use url::Url;

use super::markdown::{CHECKED, IMAGE, STRIKE, TABLE, UNCHECKED, is_placeholder};
use crate::fetch::resolve_reference;

/// Structural and decorative blocks dropped before conversion.
const NOISE_SELECTORS: &[&str] = &[
    "script",
    "style",
    "noscript",
    "iframe",
    "nav",
    "footer",
    "header",
    ".ad",
    ".ads",
    ".advertisement",
    ".social-share",
    ".comment",
    ".comments",
    "#comments",
    ".sidebar",
    ".related",
    ".recommend",
    // WeChat decorations
    ".qr_code_pc",
    ".reward_area",
];

static NOISE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(&NOISE_SELECTORS.join(", ")).expect("invalid selector"));

static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("invalid selector"));
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("invalid selector"));

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// A table lifted out of the region; cells hold cleaned HTML.
#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    pub rows: Vec<Vec<String>>,
}

/// Output of walking one content region.
#[derive(Debug, Clone, Default)]
pub(crate) struct CleanRegion {
    /// Inner HTML of the region without noise.
    pub html: String,
    /// Absolute image URLs, first-seen order, no duplicates.
    pub images: Vec<String>,
    pub tables: Vec<Table>,
    /// Whether any visible text or image survived cleaning.
    pub has_content: bool,
}

/// True if the element or one of its ancestors matches a noise selector.
pub(crate) fn is_removed(element: &ElementRef) -> bool {
    NOISE.matches(element) || element.ancestors().filter_map(ElementRef::wrap).any(|a| NOISE.matches(&a))
}

/// Walk `region` and produce its cleaned HTML plus collected images.
pub(crate) fn clean_region(region: ElementRef, base: &Url) -> CleanRegion {
    let mut walker = Walker { base, seen: HashMap::new(), out: CleanRegion::default() };
    let mut html = String::new();
    walker.children(region, &mut html);
    walker.out.html = html;
    walker.out
}

struct Walker<'a> {
    base: &'a Url,
    /// Image URL to its index in `out.images`.
    seen: HashMap<String, usize>,
    out: CleanRegion,
}

impl Walker<'_> {
    fn children(&mut self, parent: ElementRef, buf: &mut String) {
        for child in parent.children() {
            match child.value() {
                Node::Text(text) => {
                    if !text.trim().is_empty() {
                        self.out.has_content = true;
                    }
                    escape_into(text, false, buf);
                }
                Node::Element(_) => {
                    if let Some(element) = ElementRef::wrap(child) {
                        self.element(element, buf);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, element: ElementRef, buf: &mut String) {
        if NOISE.matches(&element) {
            return;
        }

        let name = element.value().name();
        match name {
            "a" if element.text().all(|t| t.trim().is_empty()) => self.linked_images(element),
            "img" => self.image(element, buf),
            "table" => self.table(element, buf),
            "del" | "s" | "strike" => {
                buf.push(STRIKE);
                self.children(element, buf);
                buf.push(STRIKE);
            }
            "input" if element.value().attr("type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) => {
                let checked = element.value().attr("checked").is_some();
                buf.push(if checked { CHECKED } else { UNCHECKED });
                buf.push(' ');
            }
            _ => {
                open_tag(&element, None, buf);
                if !VOID_ELEMENTS.contains(&name) {
                    self.children(element, buf);
                    let _ = write!(buf, "</{name}>");
                }
            }
        }
    }

    /// A dropped link writes nothing, but its images are still collected.
    fn linked_images(&mut self, link: ElementRef) {
        let mut discarded = String::new();
        for img in link.select(&IMG) {
            if !is_removed_within(&img, &link) {
                self.image(img, &mut discarded);
            }
        }
    }

    /// Lazy-load source wins over `src`. Data URIs and 1x1 trackers are kept
    /// in the output as-is but never collected. Collected sources are written
    /// as an index placeholder.
    fn image(&mut self, element: ElementRef, buf: &mut String) {
        let attrs = element.value();
        let Some(raw) = ["data-src", "src"]
            .iter()
            .filter_map(|name| attrs.attr(name))
            .find(|value| !value.trim().is_empty())
        else {
            return;
        };

        let tracking_pixel = attrs.attr("width") == Some("1") || attrs.attr("height") == Some("1");
        if raw.starts_with("data:") || tracking_pixel {
            open_tag(&element, None, buf);
            return;
        }

        let Some(resolved) = resolve_reference(self.base, raw) else {
            open_tag(&element, None, buf);
            return;
        };

        let resolved = resolved.to_string();
        let index = match self.seen.get(&resolved) {
            Some(&index) => index,
            None => {
                let index = self.out.images.len();
                self.seen.insert(resolved.clone(), index);
                self.out.images.push(resolved);
                index
            }
        };

        self.out.has_content = true;
        open_tag(&element, Some(&format!("{IMAGE}{index}{IMAGE}")), buf);
    }

    fn table(&mut self, table: ElementRef, buf: &mut String) {
        let mut rows = Vec::new();

        for row in table.select(&ROW) {
            let owner = row.ancestors().filter_map(ElementRef::wrap).find(|a| a.value().name() == "table");
            if owner.map(|t| t.id()) != Some(table.id()) || is_removed_within(&row, &table) {
                continue;
            }

            let mut cells = Vec::new();
            for cell in row.children().filter_map(ElementRef::wrap) {
                if !matches!(cell.value().name(), "th" | "td") || NOISE.matches(&cell) {
                    continue;
                }
                let mut html = String::new();
                self.children(cell, &mut html);
                cells.push(html);
            }
            rows.push(cells);
        }

        if rows.is_empty() {
            return;
        }

        let index = self.out.tables.len();
        self.out.tables.push(Table { rows });
        let _ = write!(buf, "<p>{TABLE}{index}{TABLE}</p>");
    }
}

/// Noise check limited to the ancestors between `element` and `scope`.
fn is_removed_within(element: &ElementRef, scope: &ElementRef) -> bool {
    if NOISE.matches(element) {
        return true;
    }
    element
        .ancestors()
        .take_while(|node| node.id() != scope.id())
        .filter_map(ElementRef::wrap)
        .any(|a| NOISE.matches(&a))
}

fn open_tag(element: &ElementRef, src: Option<&str>, buf: &mut String) {
    let value = element.value();
    buf.push('<');
    buf.push_str(value.name());

    for (name, attr) in value.attrs() {
        if src.is_some() && (name == "src" || name == "data-src") {
            continue;
        }
        let _ = write!(buf, " {name}=\"");
        escape_into(attr, true, buf);
        buf.push('"');
    }

    // Placeholder tokens, written unescaped.
    if let Some(src) = src {
        let _ = write!(buf, " src=\"{src}\"");
    }

    buf.push('>');
}

fn escape_into(text: &str, attribute: bool, buf: &mut String) {
    for c in text.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' if attribute => buf.push_str("&quot;"),
            c if is_placeholder(c) => {}
            _ => buf.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn clean(html: &str) -> CleanRegion {
        let doc = Html::parse_document(html);
        let body = doc.select(&Selector::parse("body").unwrap()).next().unwrap();
        clean_region(body, &Url::parse("https://example.com/posts/1").unwrap())
    }

    #[test]
    fn test_noise_removed() {
        let region = clean(
            r#"<body><p>keep</p><script>var x = 1;</script><div class="ads">buy</div><nav>menu</nav></body>"#,
        );
        assert_eq!(region.html, "<p>keep</p>");
        assert!(region.has_content);
    }

    #[test]
    fn test_empty_links_dropped() {
        let region = clean(r#"<body><a href="/x">  </a><a href="/y">Y</a></body>"#);
        assert_eq!(region.html, r#"<a href="/y">Y</a>"#);
    }

    #[test]
    fn test_images_resolved_and_deduplicated() {
        let region = clean(
            r#"<body>
                <img src="/a.jpg">
                <img src="https://t.example.com/p.gif" width="1">
                <img data-src="b.png" src="data:image/gif;base64,R0lG">
                <img src="/a.jpg">
                <img src="https://t.example.com/q.gif" height="1">
                <img src="data:image/png;base64,iVBOR">
                <img src="">
                <img src="https://cdn.example.com/c.webp">
            </body>"#,
        );

        assert_eq!(
            region.images,
            vec![
                "https://example.com/a.jpg".to_string(),
                "https://example.com/posts/b.png".to_string(),
                "https://cdn.example.com/c.webp".to_string(),
            ]
        );
        assert!(region.html.contains(&format!("<img src=\"{IMAGE}1{IMAGE}\">")));
        assert_eq!(region.html.matches(&format!("{IMAGE}0{IMAGE}")).count(), 2);
        assert!(!region.html.contains("data-src"));
    }

    #[test]
    fn test_images_inside_empty_links_collected() {
        let region = clean(
            r#"<body>
                <p>Gallery</p>
                <a href="/full.jpg"><img src="/thumb.jpg"></a>
                <a href="/px"><img src="/px.gif" width="1"></a>
                <a href="/both"><span><img data-src="/lazy.png"></span></a>
            </body>"#,
        );

        assert_eq!(
            region.images,
            vec!["https://example.com/thumb.jpg".to_string(), "https://example.com/lazy.png".to_string()]
        );
        assert!(!region.html.contains("<a"));
        assert!(!region.html.contains("<img"));
    }

    #[test]
    fn test_placeholder_code_points_stripped() {
        let region = clean("<body><p>a\u{E000}b\u{E003}0\u{E003}c\u{E004}</p></body>");
        assert_eq!(region.html, "<p>ab0c</p>");
        assert!(region.tables.is_empty());
    }

    #[test]
    fn test_escaping() {
        let region = clean(r#"<body><p title="a &quot;b&quot;">1 &lt; 2 &amp; 3</p></body>"#);
        assert_eq!(region.html, r#"<p title="a &quot;b&quot;">1 &lt; 2 &amp; 3</p>"#);
    }

    #[test]
    fn test_table_lifted() {
        let region = clean(
            "<body><table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td><del>2</del></td></tr></table></body>",
        );
        assert_eq!(region.tables.len(), 1);
        assert_eq!(region.tables[0].rows.len(), 2);
        assert_eq!(region.tables[0].rows[1][1], format!("{STRIKE}2{STRIKE}"));
        assert_eq!(region.html, format!("<p>{TABLE}0{TABLE}</p>"));
    }

    #[test]
    fn test_checkbox_tokens() {
        let region = clean(r#"<body><ul><li><input type="checkbox" checked>done</li><li><input type="checkbox">todo</li></ul></body>"#);
        assert!(region.html.contains(&format!("<li>{CHECKED} done</li>")));
        assert!(region.html.contains(&format!("<li>{UNCHECKED} todo</li>")));
    }

    #[test]
    fn test_whitespace_only_region_is_empty() {
        let region = clean("<body>\n   <script>x()</script>\n</body>");
        assert!(!region.has_content);
    }
}

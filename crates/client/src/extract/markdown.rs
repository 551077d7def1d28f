//! HTML to Markdown conversion with GitHub-flavored extensions.
//!
//! htmd handles the CommonMark subset (ATX headings, fenced code, `-`
//! bullets). Strikethrough, task-list checkboxes, tables and collected image
//! sources are marked with private-use placeholders during cleaning and
//! expanded here. Image URLs go back in byte-for-byte, unescaped.

use htmd::HtmlToMarkdown;
use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, LinkStyle, Options};
use url2md_core::Error;

use super::clean::{CleanRegion, Table};

pub(crate) const STRIKE: char = '\u{E000}';
pub(crate) const CHECKED: char = '\u{E001}';
pub(crate) const UNCHECKED: char = '\u{E002}';
pub(crate) const TABLE: char = '\u{E003}';
pub(crate) const IMAGE: char = '\u{E004}';

/// Code points reserved for placeholders; stripped from page text.
pub(crate) fn is_placeholder(c: char) -> bool {
    ('\u{E000}'..='\u{E004}').contains(&c)
}

/// Converter configured for the document output style.
pub struct MarkdownConverter {
    inner: HtmlToMarkdown,
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownConverter {
    pub fn new() -> Self {
        let options = Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            bullet_list_marker: BulletListMarker::Dash,
            link_style: LinkStyle::Inlined,
            ..Default::default()
        };

        Self { inner: HtmlToMarkdown::builder().options(options).build() }
    }

    /// Convert plain HTML.
    pub fn convert_html(&self, html: &str) -> Result<String, Error> {
        let markdown = self
            .inner
            .convert(html)
            .map_err(|e| Error::ExtractFailed(format!("markdown conversion failed: {}", e)))?;
        Ok(restore_inline(markdown.trim()))
    }

    /// Convert a cleaned region, expanding table and image placeholders.
    pub(crate) fn convert_region(&self, region: &CleanRegion) -> Result<String, Error> {
        let mut markdown = self.convert_html(&region.html)?;

        for (index, table) in region.tables.iter().enumerate() {
            let rendered = self.render_table(table)?;
            markdown = markdown.replace(&format!("{TABLE}{index}{TABLE}"), &rendered);
        }

        for (index, url) in region.images.iter().enumerate() {
            markdown = markdown.replace(&format!("{IMAGE}{index}{IMAGE}"), url);
        }

        Ok(markdown)
    }

    /// First row becomes the header; short rows are padded.
    fn render_table(&self, table: &Table) -> Result<String, Error> {
        let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let mut lines = Vec::with_capacity(table.rows.len() + 1);

        for (i, row) in table.rows.iter().enumerate() {
            let mut cells = row
                .iter()
                .map(|cell| self.convert_cell(cell))
                .collect::<Result<Vec<_>, _>>()?;
            cells.resize(columns, String::new());
            lines.push(format!("| {} |", cells.join(" | ")));

            if i == 0 {
                lines.push(format!("|{}", " --- |".repeat(columns)));
            }
        }

        Ok(lines.join("\n"))
    }

    /// Cell content must stay on one line and must not break the pipe grid.
    fn convert_cell(&self, html: &str) -> Result<String, Error> {
        let markdown = self.convert_html(html)?;
        let flattened = markdown.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(flattened.replace('|', "\\|"))
    }
}

fn restore_inline(markdown: &str) -> String {
    markdown
        .replace(STRIKE, "~~")
        .replace(CHECKED, "[x]")
        .replace(UNCHECKED, "[ ]")
}

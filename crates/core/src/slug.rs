//! Filesystem-safe slugs derived from document titles.

use regex::Regex;
use std::sync::LazyLock;

const MAX_SLUG_CHARS: usize = 100;

static NON_WORD_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("invalid slug regex"));

/// Derive a slug from a title.
///
/// Letters and digits from any script are kept; every other run of characters
/// collapses to a single `-`. Leading/trailing hyphens are trimmed and the
/// result is cut to 100 characters. Falls back to `untitled`.
pub fn slugify(title: &str) -> String {
    let collapsed = NON_WORD_RUN.replace_all(title, "-");
    let trimmed = collapsed.trim_matches('-');
    let slug: String = trimmed.chars().take(MAX_SLUG_CHARS).collect();

    if slug.is_empty() { "untitled".to_string() } else { slug }
}

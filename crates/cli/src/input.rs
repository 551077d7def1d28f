//! Collects the URLs to process from the batch file, arguments or stdin.

use anyhow::{Context, Result};
use std::io::IsTerminal;
use tokio::io::AsyncReadExt;

use crate::args::Args;

/// One URL per line; blank lines and `#` comments are skipped.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Batch file wins, then positional arguments, then piped stdin.
pub async fn collect_urls(args: &Args) -> Result<Vec<String>> {
    if let Some(path) = &args.batch {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read batch file {}", path.display()))?;
        return Ok(parse_url_list(&content));
    }

    if !args.urls.is_empty() {
        return Ok(args.urls.clone());
    }

    if !std::io::stdin().is_terminal() {
        let mut input = String::new();
        tokio::io::stdin()
            .read_to_string(&mut input)
            .await
            .context("failed to read URLs from stdin")?;
        return Ok(parse_url_list(&input));
    }

    Ok(Vec::new())
}

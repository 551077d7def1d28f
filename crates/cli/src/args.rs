//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

const EXAMPLES: &str = "\
Examples:
  url2md https://mp.weixin.qq.com/s/xxxxx
  url2md https://example.com/article -o ~/reading/
  url2md --batch urls.txt
  echo \"https://example.com\" | url2md";

/// URL to Markdown exporter.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "url2md", version, after_help = EXAMPLES)]
pub struct Args {
    /// URLs to convert.
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Output directory (default: ./output).
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Force browser mode.
    #[arg(short, long)]
    pub browser: bool,

    /// Batch mode: one URL per line.
    #[arg(long, value_name = "FILE")]
    pub batch: Option<PathBuf>,

    /// Run the browser without a window.
    #[arg(long)]
    pub headless: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    pub json_logs: bool,
}

//! url2md entry point.
//!
//! Collects URLs, runs them through the pipeline one by one and writes
//! Markdown files. Logs go to stderr.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url2md_client::Renderer;
use url2md_core::AppConfig;

mod args;
mod input;
mod pipeline;

use args::Args;
use pipeline::Pipeline;

const DEFAULT_LOG_FILTER: &str = "url2md=info,url2md_client=info,url2md_core=warn";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let urls = input::collect_urls(&args).await?;
    if urls.is_empty() {
        eprintln!("{}", Args::command().render_help());
        return Ok(ExitCode::FAILURE);
    }

    let mut config = AppConfig::load()?;
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if args.headless {
        config.headless = true;
    }
    config.output_dir = std::path::absolute(&config.output_dir)?;

    let pipeline = Pipeline::new(&config, renderer(&config), args.browser)?;
    pipeline.run(&urls).await;

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[cfg(feature = "render")]
fn renderer(config: &AppConfig) -> Arc<dyn Renderer> {
    use url2md_client::{BrowserSession, SessionOptions};
    Arc::new(BrowserSession::new(SessionOptions::from_app_config(config)))
}

#[cfg(not(feature = "render"))]
fn renderer(_config: &AppConfig) -> Arc<dyn Renderer> {
    Arc::new(url2md_client::DisabledRenderer)
}

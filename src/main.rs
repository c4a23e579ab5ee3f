mod api;
mod app;
mod avatar;
mod commands;
mod config;
mod event;
mod logging;
mod query;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "robodash")]
#[command(about = "A terminal dashboard for the robo-loader status backend")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/robodash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend API base URL (overrides config and ROBODASH_API_URL)
  #[arg(short, long)]
  api_url: Option<String>,

  /// Refetch interval for continuous queries, in milliseconds
  #[arg(short, long)]
  interval_ms: Option<u64>,

  /// Log filter directive, e.g. "debug" or "robodash=trace"
  #[arg(short, long)]
  log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line beats config file and environment
  if let Some(url) = args.api_url {
    config.api.base_url = url;
  }
  if let Some(interval) = args.interval_ms {
    config.polling.interval_ms = interval;
  }
  if let Some(level) = args.log_level {
    config.log.level = level;
  }

  // The terminal belongs to the UI, so logs go to a file
  let _log_guard = logging::init(&config.log)?;
  info!(api = %config.api.base_url, "starting robodash");

  app::install_panic_hook();

  let mut app = app::App::new(&config)?;
  app.run().await?;

  Ok(())
}

//! File logging. The terminal belongs to the UI, so nothing goes to stdout.

use crate::config::LogConfig;
use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. The returned guard flushes
/// buffered lines on drop and must live until the program exits.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
  let path = config.file_path()?;
  let dir = path
    .parent()
    .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;
  let file_name = path
    .file_name()
    .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;

  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false),
    )
    .with(filter(&config.level)?)
    .try_init()
    .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

  Ok(guard)
}

fn filter(default_level: &str) -> Result<EnvFilter> {
  match EnvFilter::try_from_default_env() {
    Ok(filter) => Ok(filter),
    Err(_) => EnvFilter::try_new(default_level)
      .map_err(|e| eyre!("Invalid log level {:?}: {}", default_level, e)),
  }
}

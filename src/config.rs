use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `api.base_url` from the config file.
pub const API_URL_ENV: &str = "ROBODASH_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Custom title for the header (defaults to the API host)
  pub title: Option<String>,
  pub api: ApiConfig,
  pub polling: PollingConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Base URL every endpoint path is joined onto
  pub base_url: String,
  pub timeout_ms: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://127.0.0.1:8000/api/".to_string(),
      timeout_ms: 5000,
    }
  }
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
  /// Refetch interval for continuous queries
  pub interval_ms: u64,
  /// Refetch interval for the message terminal
  pub messages_interval_ms: u64,
  /// Retries for fetch-once queries (module list, author mapping)
  pub retry_count: u32,
  /// Base delay of the exponential retry back-off
  pub retry_delay_ms: u64,
  /// How long an unobserved cache entry is kept for reuse
  pub gc_time_secs: u64,
}

impl Default for PollingConfig {
  fn default() -> Self {
    Self {
      interval_ms: 1000,
      messages_interval_ms: 1500,
      retry_count: 3,
      retry_delay_ms: 1000,
      gc_time_secs: 300,
    }
  }
}

impl PollingConfig {
  pub fn interval(&self) -> Duration {
    Duration::from_millis(self.interval_ms.max(1))
  }

  pub fn messages_interval(&self) -> Duration {
    Duration::from_millis(self.messages_interval_ms.max(1))
  }

  pub fn retry_delay(&self) -> Duration {
    Duration::from_millis(self.retry_delay_ms)
  }

  pub fn gc_time(&self) -> Duration {
    Duration::from_secs(self.gc_time_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Default filter directive; `RUST_LOG` takes precedence
  pub level: String,
  /// Log file path (default: $XDG_DATA_HOME/robodash/robodash.log)
  pub file: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      file: None,
    }
  }
}

impl LogConfig {
  /// Resolve the log file location.
  pub fn file_path(&self) -> Result<PathBuf> {
    if let Some(file) = &self.file {
      return Ok(file.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory for the log file"))?;

    Ok(data_dir.join("robodash").join("robodash.log"))
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./robodash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/robodash/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    Ok(config.with_env_overrides(std::env::var(API_URL_ENV).ok()))
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("robodash.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("robodash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file is a valid "all defaults" config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  fn with_env_overrides(mut self, api_url: Option<String>) -> Self {
    if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
      self.api.base_url = url;
    }
    self
  }
}

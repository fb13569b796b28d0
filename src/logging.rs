//! File logging.
//!
//! The shell owns stdout, so tracing output goes to a daily rolling file
//! instead.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Environment variable that overrides the configured filter
pub const LOG_ENV: &str = "EXAMKIT_LOG";

const DEFAULT_LEVEL: &str = "info";

/// Install the global subscriber. Keep the returned guard alive until exit
/// or buffered lines are lost.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
  let directory = log_directory(config)?;
  std::fs::create_dir_all(&directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let appender = tracing_appender::rolling::daily(&directory, "examkit.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(directive(config)));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

fn directive(config: &LogConfig) -> &str {
  config.level.as_deref().unwrap_or(DEFAULT_LEVEL)
}

fn log_directory(config: &LogConfig) -> Result<PathBuf> {
  if let Some(dir) = &config.directory {
    return Ok(dir.clone());
  }

  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("examkit").join("logs"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_directive_defaults_to_info() {
    assert_eq!(directive(&LogConfig::default()), "info");

    let config = LogConfig {
      level: Some("examkit=debug".to_string()),
      directory: None,
    };
    assert_eq!(directive(&config), "examkit=debug");
  }

  #[test]
  fn test_explicit_directory_wins() {
    let config = LogConfig {
      level: None,
      directory: Some(PathBuf::from("/tmp/examkit-logs")),
    };
    assert_eq!(log_directory(&config).unwrap(), PathBuf::from("/tmp/examkit-logs"));
  }
}

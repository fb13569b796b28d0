use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
  /// Which side of the platform this user is on
  #[serde(default)]
  pub role: Role,
  /// Student or instructor id, used as the default for per-user listings
  pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  Instructor,
  Student,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  pub url: String,
  /// Per-request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  #[serde(default = "default_ttl_secs")]
  pub default_ttl_secs: u64,
  /// Requests per window when loading many resources at once
  #[serde(default = "default_batch_concurrency")]
  pub batch_concurrency: usize,
  /// TTL in seconds for endpoints starting with the given prefix (longest prefix wins)
  #[serde(default)]
  pub ttl_overrides: BTreeMap<String, u64>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      default_ttl_secs: default_ttl_secs(),
      batch_concurrency: default_batch_concurrency(),
      ttl_overrides: BTreeMap::new(),
    }
  }
}

fn default_true() -> bool {
  true
}

fn default_ttl_secs() -> u64 {
  300
}

fn default_batch_concurrency() -> usize {
  crate::cache::DEFAULT_BATCH_CONCURRENCY
}

impl CacheConfig {
  pub fn default_ttl(&self) -> Duration {
    Duration::from_secs(self.default_ttl_secs)
  }

  /// TTL override for `endpoint`, if one is configured.
  pub fn ttl_for(&self, endpoint: &str) -> Option<Duration> {
    self
      .ttl_overrides
      .iter()
      .filter(|(prefix, _)| endpoint.starts_with(prefix.as_str()))
      .max_by_key(|(prefix, _)| prefix.len())
      .map(|(_, secs)| Duration::from_secs(*secs))
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Filter directive, e.g. "info" or "examkit=debug"
  pub level: Option<String>,
  /// Directory for log files (default: $XDG_DATA_HOME/examkit/logs)
  pub directory: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./examkit.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/examkit/config.yaml
  /// 4. ~/.config/examkit/config.yaml
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/examkit/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("examkit.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("examkit").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    if let Some(home) = dirs::home_dir() {
      let fallback = home.join(".config").join("examkit").join("config.yaml");
      if fallback.exists() {
        return Some(fallback);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.cache.batch_concurrency == 0 {
      return Err(eyre!("cache.batch_concurrency must be at least 1"));
    }
    Ok(config)
  }

  /// Get the backend API token from environment variables.
  ///
  /// Checks EXAMKIT_API_TOKEN first, then EXAMKIT_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("EXAMKIT_API_TOKEN")
      .or_else(|_| std::env::var("EXAMKIT_TOKEN"))
      .map_err(|_| eyre!("API token not found. Set EXAMKIT_API_TOKEN or EXAMKIT_TOKEN environment variable."))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::parse("backend:\n  url: https://exams.example.edu/api\n").unwrap();

    assert_eq!(config.backend.timeout_secs, 30);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.default_ttl(), Duration::from_secs(300));
    assert_eq!(config.cache.batch_concurrency, 5);
    assert_eq!(config.role, Role::Instructor);
    assert!(config.user_id.is_none());
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
backend:
  url: http://localhost:8000
  timeout_secs: 5
cache:
  enabled: false
  default_ttl_secs: 60
  batch_concurrency: 2
  ttl_overrides:
    /analytics: 30
role: student
user_id: s-104
log:
  level: debug
"#;
    let config = Config::parse(yaml).unwrap();

    assert!(!config.cache.enabled);
    assert_eq!(config.cache.batch_concurrency, 2);
    assert_eq!(config.role, Role::Student);
    assert_eq!(config.user_id.as_deref(), Some("s-104"));
    assert_eq!(config.log.level.as_deref(), Some("debug"));
  }

  #[test]
  fn test_zero_batch_concurrency_is_rejected() {
    let yaml = "backend:\n  url: http://x\ncache:\n  batch_concurrency: 0\n";
    assert!(Config::parse(yaml).is_err());
  }

  #[test]
  fn test_longest_ttl_override_wins() {
    let mut cache = CacheConfig::default();
    cache.ttl_overrides.insert("/exams".to_string(), 60);
    cache.ttl_overrides.insert("/exams/questions".to_string(), 10);

    assert_eq!(cache.ttl_for("/exams/questions"), Some(Duration::from_secs(10)));
    assert_eq!(cache.ttl_for("/exams"), Some(Duration::from_secs(60)));
    assert_eq!(cache.ttl_for("/courses"), None);
  }
}

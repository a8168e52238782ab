use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::{stale_threshold, DEFAULT_STALE_THRESHOLD_MS};

/// Environment variable overriding `staleThresholdMs`.
pub const STALE_THRESHOLD_ENV: &str = "FRESHCACHE_STALE_THRESHOLD_MS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
  /// Age in milliseconds after which a completed fetch is stale
  #[serde(
    rename = "staleThresholdMs",
    alias = "stale_threshold_ms",
    default = "default_stale_threshold_ms"
  )]
  pub stale_threshold_ms: u64,
  /// Tracing filter directive used when FRESHCACHE_LOG is unset (e.g. "debug")
  #[serde(default)]
  pub log_filter: Option<String>,
}

fn default_stale_threshold_ms() -> u64 {
  DEFAULT_STALE_THRESHOLD_MS
}

impl Default for Config {
  fn default() -> Self {
    Self {
      stale_threshold_ms: DEFAULT_STALE_THRESHOLD_MS,
      log_filter: None,
    }
  }
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./freshcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/freshcache/config.yaml
  ///
  /// With no file found the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    Self::load_with_env(explicit_path, |key| std::env::var(key).ok())
  }

  fn load_with_env<F>(explicit_path: Option<&Path>, var: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let path = match explicit_path {
      Some(p) if !p.exists() => return Err(eyre!("Config file not found: {}", p.display())),
      Some(p) => Some(p.to_path_buf()),
      None => candidate_paths().find(|p| p.exists()),
    };

    let config: Self = match path {
      Some(path) => {
        let contents = std::fs::read_to_string(&path)
          .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        serde_yaml::from_str(&contents)
          .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?
      }
      None => Self::default(),
    };

    config.with_env_overrides(var)
  }

  /// Apply overrides looked up through `var`.
  fn with_env_overrides<F>(mut self, var: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(raw) = var(STALE_THRESHOLD_ENV) {
      self.stale_threshold_ms = raw
        .trim()
        .parse()
        .map_err(|e| eyre!("Invalid {} value '{}': {}", STALE_THRESHOLD_ENV, raw, e))?;
    }
    Ok(self)
  }

  pub fn stale_threshold(&self) -> Duration {
    stale_threshold(self.stale_threshold_ms)
  }
}

/// Config files looked for when no path is given, in priority order.
fn candidate_paths() -> impl Iterator<Item = PathBuf> {
  std::iter::once(PathBuf::from("freshcache.yaml")).chain(
    dirs::config_dir().map(|dir| dir.join("freshcache").join("config.yaml")),
  )
}

//! TOML-based service configuration.
//!
//! Holds everything the core treats as a constant at runtime:
//! - Known task types and their point values
//! - The nightly accrual window, rate and tick interval
//! - Command prefix and leaderboard size
//!
//! Configuration is stored at `<config dir>/chorebot/config.toml` unless a
//! path is given explicitly. The chat credential never lives here; it is
//! read from the environment at bootstrap.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::clock::AccrualWindow;
use crate::error::ConfigError;
use crate::tasks::TaskCatalog;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CHOREBOT_CONFIG";

/// Task-type table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default)]
    pub points: TaskCatalog,
}

/// Voice accrual configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccrualConfig {
    #[serde(default = "default_window_start")]
    pub window_start_hour: u32,
    #[serde(default = "default_window_end")]
    pub window_end_hour: u32,
    #[serde(default = "default_rate")]
    pub rate_per_tick: u64,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

/// Command front-end configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_top_limit")]
    pub top_limit: usize,
}

/// Service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub accrual: AccrualConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
}

fn default_window_start() -> u32 {
    21
}
fn default_window_end() -> u32 {
    2
}
fn default_rate() -> u64 {
    1
}
fn default_interval() -> u64 {
    60
}
fn default_prefix() -> String {
    "!".into()
}
fn default_top_limit() -> usize {
    10
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            window_start_hour: default_window_start(),
            window_end_hour: default_window_end(),
            rate_per_tick: default_rate(),
            interval_secs: default_interval(),
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            top_limit: default_top_limit(),
        }
    }
}

impl AccrualConfig {
    pub fn window(&self) -> AccrualWindow {
        AccrualWindow::new(self.window_start_hour, self.window_end_hour)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Default location: `<config dir>/chorebot/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or_else(|| ConfigError::LoadFailed {
            path: PathBuf::from("."),
            message: "could not determine the user config directory".into(),
        })?;
        Ok(base.join("chorebot").join("config.toml"))
    }

    /// Resolve the config path from an explicit argument, then
    /// `CHOREBOT_CONFIG`, then the default location.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        Self::locate(explicit).map(|(path, _)| path)
    }

    /// Like [`Config::resolve_path`], also reporting whether the default
    /// location was used.
    fn locate(explicit: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
        if let Some(path) = explicit {
            return Ok((path.to_path_buf(), false));
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Ok((PathBuf::from(path), false)),
            _ => Ok((Self::default_path()?, true)),
        }
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load the service configuration, creating the default file on first run.
    ///
    /// Defaults are only written at the default location. A missing file at
    /// an explicit or `CHOREBOT_CONFIG` path is an error.
    pub fn load_or_init(explicit: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let (path, is_default) = Self::locate(explicit)?;
        let cfg = Self::load_at(&path, is_default, true)?;
        Ok((cfg, path))
    }

    /// Load without writing anything: a missing default file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let (path, is_default) = Self::locate(explicit)?;
        let cfg = Self::load_at(&path, is_default, false)?;
        Ok((cfg, path))
    }

    /// Load an existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be read or parsed, or
    /// fails validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::load_at(path, false, false)
    }

    fn load_at(path: &Path, is_default: bool, init: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && is_default => {
                let cfg = Self::default();
                if init {
                    cfg.save_to(path)?;
                    info!(path = %path.display(), "wrote default configuration");
                }
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Check every value the core relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        };

        if self.tasks.points.is_empty() {
            return Err(ConfigError::MissingKey("tasks.points".into()));
        }
        let mut seen = HashSet::new();
        for (name, _) in self.tasks.points.iter() {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidValue {
                    key: format!("tasks.points.{name}"),
                    message: "task type names must be a single word".into(),
                });
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(ConfigError::InvalidValue {
                    key: format!("tasks.points.{name}"),
                    message: "duplicates another task type (names are case-insensitive)".into(),
                });
            }
        }
        if self.accrual.window_start_hour >= 24 {
            return Err(invalid("accrual.window_start_hour", "must be between 0 and 23"));
        }
        if self.accrual.window_end_hour >= 24 {
            return Err(invalid("accrual.window_end_hour", "must be between 0 and 23"));
        }
        if self.accrual.window_start_hour == self.accrual.window_end_hour {
            return Err(invalid(
                "accrual.window_end_hour",
                "must differ from window_start_hour",
            ));
        }
        if self.accrual.rate_per_tick == 0 {
            return Err(invalid("accrual.rate_per_tick", "must be positive"));
        }
        if self.accrual.interval_secs == 0 {
            return Err(invalid("accrual.interval_secs", "must be positive"));
        }
        if self.commands.prefix.trim().is_empty() {
            return Err(invalid("commands.prefix", "must not be empty"));
        }
        if self.commands.top_limit == 0 {
            return Err(invalid("commands.top_limit", "must be positive"));
        }
        Ok(())
    }
}

//! Settings loaded from an optional TOML file.
//!
//! Every key has a default, so an absent file at the default location is
//! not an error. Command-line flags are applied on top by the binary, which
//! then calls [`Settings::validate`] again.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::APP_NAME;
use crate::app::systemd::{ListFormat, Scope};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scope: Scope,
    /// Include inactive units in the listing.
    pub list_all: bool,
    pub format: ListFormat,
    /// Timeout for every systemctl invocation.
    pub timeout_secs: u64,
    pub systemctl_path: String,
    /// Interactive auto-reload period; 0 disables it.
    pub refresh_interval_secs: u64,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// Log file for the interactive mode.
    pub file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scope: Scope::User,
            list_all: true,
            format: ListFormat::Auto,
            timeout_secs: 5,
            systemctl_path: "systemctl".to_string(),
            refresh_interval_secs: 0,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Settings {
    /// `<config_dir>/systemd-user-tui/config.toml`, if the platform has a
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
    }

    /// Loads from `explicit` if given (it must exist), otherwise from the
    /// default path if a file is there, otherwise returns defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config { message } => {
                Error::config(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| Error::config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', expected one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be greater than zero"));
        }
        if self.systemctl_path.trim().is_empty() {
            return Err(Error::config("systemctl_path cannot be empty"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }

    pub fn log_file(&self) -> PathBuf {
        self.logging.file.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join(format!("{APP_NAME}.log"))
        })
    }
}

use ecjtu_storage::{StorageError, StorageResolver};
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the config inside the storage root.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logger name printed in every line.
    pub name: String,
    /// Minimum severity written to the log file. Fixed for the session's lifetime.
    pub level: LogLevel,
    /// Storage subdirectory holding the daily log files.
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            name: "ecjtu".to_string(),
            level: LogLevel::Debug,
            directory: "logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl Config {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `<storage-root>/config.toml`, falling back to defaults.
    ///
    /// A missing file is silent. Anything else that goes wrong is reported on
    /// stderr, since the log file does not exist yet at this point.
    pub fn load_or_default(resolver: &StorageResolver) -> Self {
        let path = match config_path(resolver) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("warning: {e}");
                return Config::default();
            }
        };
        match Config::load(&path) {
            Ok(cfg) => cfg,
            Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Config::default()
            }
            Err(e) => {
                eprintln!("warning: {e}");
                Config::default()
            }
        }
    }
}

/// Path of the config file, creating the storage root if needed.
pub fn config_path(resolver: &StorageResolver) -> Result<PathBuf, StorageError> {
    let root = resolver.resolve("")?;
    Ok(root.as_path().join(CONFIG_FILE_NAME))
}

//! Per-user storage directory resolution for ecjtu.
//!
//! Every piece of persisted state (logs, config) lives under one storage root:
//! `~/.ecjtu` when the home directory is writable, `<tmp>/ecjtu` otherwise.
//! Directories are created on demand and returned as forward-slash strings so
//! callers can build paths with plain string formatting on every platform.
//!
//! # Usage
//!
//! ```no_run
//! use ecjtu_storage::default_storage_path;
//!
//! let logs = default_storage_path("logs").expect("storage unavailable");
//! println!("{}/20240101.log", logs);
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory name under the user's home.
pub const HOME_DIR_NAME: &str = ".ecjtu";

/// Directory name under the system temp directory, used on fallback.
pub const TEMP_DIR_NAME: &str = "ecjtu";

/// Errors from storage resolution.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not determine the user home directory")]
    HomeMissing,
    #[error("failed to create storage directory {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A resolved, existing storage directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageDir {
    path: String,
    fallback: bool,
}

impl StorageDir {
    fn new(path: &Path, fallback: bool) -> Self {
        Self {
            path: convert_backslashes(&path.to_string_lossy()),
            fallback,
        }
    }

    /// The directory as a forward-slash string.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.path)
    }

    /// True when the home location was not writable and the temp location was used.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn into_string(self) -> String {
        self.path
    }
}

impl fmt::Display for StorageDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl AsRef<Path> for StorageDir {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

/// Resolves storage directories against a home root and a temp root.
#[derive(Debug, Clone)]
pub struct StorageResolver {
    home: PathBuf,
    temp: PathBuf,
}

impl StorageResolver {
    /// Build a resolver from explicit roots. `home` is the user's home
    /// directory (not the `.ecjtu` directory itself), `temp` the system temp
    /// directory. Both should be absolute.
    pub fn new(home: impl Into<PathBuf>, temp: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            temp: temp.into(),
        }
    }

    /// Build a resolver from the platform's home and temp directories.
    pub fn from_env() -> Result<Self, StorageError> {
        let home = dirs::home_dir().ok_or(StorageError::HomeMissing)?;
        Ok(Self::new(home, std::env::temp_dir()))
    }

    /// `<home>/.ecjtu[/<subdir>]`, not created.
    pub fn primary_dir(&self, subdir: &str) -> PathBuf {
        with_subdir(self.home.join(HOME_DIR_NAME), subdir)
    }

    /// `<temp>/ecjtu[/<subdir>]`, not created.
    pub fn fallback_dir(&self, subdir: &str) -> PathBuf {
        with_subdir(self.temp.join(TEMP_DIR_NAME), subdir)
    }

    /// Resolve and create the storage directory for `subdir` (empty for the root).
    ///
    /// Falls back to the temp location only when creating the home location
    /// fails with `PermissionDenied`. Any other error, or any error on the
    /// fallback, is returned.
    pub fn resolve(&self, subdir: &str) -> Result<StorageDir, StorageError> {
        self.resolve_with(subdir, |path| fs::create_dir_all(path))
    }

    fn resolve_with<F>(&self, subdir: &str, create: F) -> Result<StorageDir, StorageError>
    where
        F: Fn(&Path) -> io::Result<()>,
    {
        let primary = self.primary_dir(subdir);
        match create(&primary) {
            Ok(()) => Ok(StorageDir::new(&primary, false)),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                let fallback = self.fallback_dir(subdir);
                create(&fallback).map_err(|source| StorageError::Create {
                    path: fallback.clone(),
                    source,
                })?;
                Ok(StorageDir::new(&fallback, true))
            }
            Err(source) => Err(StorageError::Create {
                path: primary,
                source,
            }),
        }
    }
}

fn with_subdir(root: PathBuf, subdir: &str) -> PathBuf {
    if subdir.is_empty() {
        root
    } else {
        root.join(subdir)
    }
}

/// Resolve `subdir` against the current user's home and temp directories.
pub fn default_storage_path(subdir: &str) -> Result<StorageDir, StorageError> {
    StorageResolver::from_env()?.resolve(subdir)
}

/// Replace every `\` with `/`.
pub fn convert_backslashes(path: &str) -> String {
    path.replace('\\', "/")
}

//! The session's log file, rotated at local midnight.
//!
//! The active file is named `<YYYYMMDD>.log` after the local date the session
//! was opened and keeps that name for the life of the process. At midnight
//! `file-rotate` moves its contents aside to `<YYYYMMDD>.log.<YYYYMMDD>`,
//! suffixed with the day they cover, and starts the active file afresh.
//! Rotated files are never deleted.

use chrono::{Local, NaiveDate};
use file_rotate::compression::Compression;
use file_rotate::suffix::{AppendTimestamp, DateFrom, FileLimit};
use file_rotate::{ContentLimit, FileRotate, TimeFrequency};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Date format of the suffix appended to rotated-out files.
pub const ROTATED_SUFFIX_FORMAT: &str = "%Y%m%d";

/// `<YYYYMMDD>.log` for `date`.
pub fn log_file_name(date: NaiveDate) -> String {
    format!("{}.log", date.format("%Y%m%d"))
}

/// A daily-rotating log file inside one directory.
pub struct DailyFile {
    path: PathBuf,
    inner: Mutex<FileRotate<AppendTimestamp>>,
}

impl DailyFile {
    /// Open today's file in `dir`. The directory must already exist.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        Self::open_on(dir, Local::now().date_naive())
    }

    /// Open the file named for `date` in `dir`.
    pub fn open_on(dir: impl AsRef<Path>, date: NaiveDate) -> io::Result<Self> {
        let path = dir.as_ref().join(log_file_name(date));
        // file-rotate opens lazily and discards open errors; surface them here.
        OpenOptions::new().create(true).append(true).open(&path)?;
        let inner = FileRotate::new(
            &path,
            AppendTimestamp::with_format(
                ROTATED_SUFFIX_FORMAT,
                FileLimit::Unlimited,
                DateFrom::DateYesterday,
            ),
            ContentLimit::Time(TimeFrequency::Daily),
            Compression::None,
            #[cfg(unix)]
            None,
        );
        Ok(Self {
            path,
            inner: Mutex::new(inner),
        })
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Files rotated out so far, oldest first.
    pub fn rotated_files(&self) -> Vec<PathBuf> {
        self.lock().log_paths()
    }

    // The panic hook writes through this lock; a poisoned lock must not
    // swallow the panic report.
    fn lock(&self) -> MutexGuard<'_, FileRotate<AppendTimestamp>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DailyFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyFile").field("path", &self.path).finish()
    }
}

/// One `write_all` per record under the lock, so concurrent writers never
/// interleave within a line.
impl Write for &DailyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

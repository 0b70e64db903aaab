//! The logging context.
//!
//! A [`LogSession`] owns the daily-rotating file and the `tracing` dispatcher
//! that writes to it. Sessions are passed by reference to whoever needs to
//! log; the dispatcher is applied by scope with [`LogSession::in_scope`] rather
//! than installed as the global default.
//!
//! The process-wide session is created at most once. Every call to
//! [`LogSession::init_process`] after the first returns the same instance, so
//! the whole process shares a single file handle.

use crate::config::LoggingConfig;
use crate::format::LineFormat;
use crate::rotation::DailyFile;
use ecjtu_storage::{StorageDir, StorageError, StorageResolver};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{Dispatch, Level};

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to open log file in {}: {source}", .dir.display())]
    Open {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

static PROCESS: OnceLock<LogSession> = OnceLock::new();
static PROCESS_INIT: Mutex<()> = Mutex::new(());

pub struct LogSession {
    name: String,
    level: Level,
    log_dir: StorageDir,
    file: Arc<DailyFile>,
    dispatch: Dispatch,
}

impl LogSession {
    /// Open a session writing to `<storage>/<config.directory>/<YYYYMMDD>.log`.
    pub fn open(resolver: &StorageResolver, config: &LoggingConfig) -> Result<Self, LogError> {
        let log_dir = resolver.resolve(&config.directory)?;
        let file = DailyFile::open(log_dir.as_path()).map_err(|source| LogError::Open {
            dir: log_dir.as_path().to_path_buf(),
            source,
        })?;
        let file = Arc::new(file);
        let level = Level::from(config.level);

        // `with_ansi` only exists while the default event format is in place.
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(LineFormat::new(&config.name))
            .with_writer(Arc::clone(&file))
            .with_max_level(level)
            .finish();

        let session = Self {
            name: config.name.clone(),
            level,
            log_dir,
            file,
            dispatch: Dispatch::new(subscriber),
        };

        session.in_scope(|| {
            if session.log_dir.is_fallback() {
                tracing::warn!(
                    dir = %session.log_dir,
                    "home directory not writable, logging to temp directory"
                );
            }
            tracing::debug!(file = %session.current_file().display(), "log session opened");
        });

        Ok(session)
    }

    /// Open the process-wide session, or return it if it already exists.
    ///
    /// Arguments are only used by the call that creates the session.
    pub fn init_process(
        resolver: &StorageResolver,
        config: &LoggingConfig,
    ) -> Result<&'static LogSession, LogError> {
        if let Some(session) = PROCESS.get() {
            return Ok(session);
        }
        let _guard = PROCESS_INIT.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = PROCESS.get() {
            return Ok(session);
        }
        let session = LogSession::open(resolver, config)?;
        Ok(PROCESS.get_or_init(|| session))
    }

    /// The process-wide session, if it has been opened.
    pub fn process() -> Option<&'static LogSession> {
        PROCESS.get()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn log_dir(&self) -> &StorageDir {
        &self.log_dir
    }

    /// The file records are currently appended to.
    pub fn current_file(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with this session as the current thread's dispatcher.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl fmt::Debug for LogSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSession")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("log_dir", &self.log_dir)
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

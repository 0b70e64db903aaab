//! ecjtu-core: logging context and process entry point support.
//!
//! This crate holds the daily-rotating log file, the logging session built on
//! top of it, the top-level error boundary, and the command-line surface of
//! the `ecjtu` binary. Exposed as a library for integration testing.

pub mod boundary;
pub mod cli;
pub mod config;
pub mod format;
pub mod rotation;
pub mod session;
pub mod signals;

pub use boundary::{install_panic_hook, run_guarded, Interrupted};
pub use config::{Config, LoggingConfig};
pub use session::{LogError, LogSession};

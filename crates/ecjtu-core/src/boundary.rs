//! Top-level error boundary for the process entry point.
//!
//! Two kinds of failure reach the top of a Rust program: panics, which unwind,
//! and errors returned from the entry point. Panics are recorded by a chaining
//! panic hook ([`install_panic_hook`]); returned errors by [`run_guarded`].
//! Both write one `ERROR` record through the session and then fall through to
//! the standard report on stderr.
//!
//! User interrupts are not failures. A panic carrying an [`Interrupted`]
//! payload, or an error whose chain contains [`Interrupted`], skips the log.

use crate::session::LogSession;
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::{self, Location};
use std::process::ExitCode;

/// Exit code for runs stopped by the user (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Marker for a run stopped by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("interrupted")]
pub struct Interrupted;

/// Replace the panic hook with one that logs through `session` first.
///
/// The previous hook is kept and called after logging, so the usual report
/// still reaches stderr. The replacement is never undone.
pub fn install_panic_hook(session: &LogSession) {
    let dispatch = session.dispatch().clone();
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if !is_interrupt_payload(info.payload()) {
            let thread = std::thread::current();
            let report = panic_report(
                thread.name().unwrap_or("<unnamed>"),
                info.payload(),
                info.location(),
                &Backtrace::capture(),
            );
            tracing::dispatcher::with_default(&dispatch, || {
                tracing::error!(target: "panic", "Uncaught panic: {report}");
            });
        }
        previous(info);
    }));
}

/// Run the entry point body inside the boundary and turn its outcome into an exit code.
///
/// `body` runs with `session` in scope. Errors other than interrupts are
/// logged once, then printed the way `main` would print them.
pub fn run_guarded<E, F>(session: &LogSession, body: F) -> ExitCode
where
    E: Into<anyhow::Error>,
    F: FnOnce() -> Result<(), E>,
{
    let result = session.in_scope(body);
    ExitCode::from(settle(session, result))
}

fn settle<E>(session: &LogSession, result: Result<(), E>) -> u8
where
    E: Into<anyhow::Error>,
{
    let err = match result {
        Ok(()) => return 0,
        Err(e) => e.into(),
    };
    if is_interrupt(&err) {
        return INTERRUPTED_EXIT_CODE;
    }
    session.in_scope(|| {
        tracing::error!(target: "boundary", "Uncaught error: {}", error_report(&err));
    });
    eprintln!("Error: {err:?}");
    1
}

/// `message [RootCause]` on the first line, so the record names the concrete
/// failure. Context chains and captured backtraces follow on later lines.
fn error_report(err: &anyhow::Error) -> String {
    let mut report = format!("{err} [{:?}]", err.root_cause());
    let chained = err.chain().nth(1).is_some();
    if chained || err.backtrace().status() == BacktraceStatus::Captured {
        report.push('\n');
        report.push_str(&format!("{err:?}"));
    }
    report
}

pub fn is_interrupt(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<Interrupted>())
}

fn is_interrupt_payload(payload: &(dyn Any + Send)) -> bool {
    payload.is::<Interrupted>()
}

fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Box<dyn Any>"
    }
}

fn panic_report(
    thread: &str,
    payload: &(dyn Any + Send),
    location: Option<&Location<'_>>,
    backtrace: &Backtrace,
) -> String {
    let mut report = match location {
        Some(loc) => format!("thread '{thread}' panicked at {loc}:\n"),
        None => format!("thread '{thread}' panicked:\n"),
    };
    report.push_str(payload_message(payload));
    if backtrace.status() == BacktraceStatus::Captured {
        report.push_str("\nstack backtrace:\n");
        report.push_str(&backtrace.to_string());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;
    use anyhow::Context;
    use ecjtu_storage::StorageResolver;

    fn open_session(root: &std::path::Path) -> LogSession {
        let resolver = StorageResolver::new(root.join("home"), root.join("tmp"));
        LogSession::open(&resolver, &LoggingConfig::default()).unwrap()
    }

    fn error_lines(session: &LogSession) -> Vec<String> {
        std::fs::read_to_string(session.current_file())
            .unwrap()
            .lines()
            .filter(|l| l.contains(" | ERROR | "))
            .map(str::to_string)
            .collect()
    }

    #[derive(Debug, thiserror::Error)]
    #[error("quota exceeded for {0}")]
    struct QuotaError(String);

    #[test]
    fn ok_exits_zero_without_logging() {
        let dir = tempfile::tempdir().unwrap();
        let session = open_session(dir.path());

        let code = settle(&session, Ok::<(), anyhow::Error>(()));

        assert_eq!(code, 0);
        assert!(error_lines(&session).is_empty());
    }

    #[test]
    fn error_is_logged_once() {
        let dir = tempfile::tempdir().unwrap();
        let session = open_session(dir.path());

        let code = settle(&session, Err::<(), _>(QuotaError("alice".into())));

        assert_eq!(code, 1);
        let lines = error_lines(&session);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("ecjtu:boundary:"));
        assert!(lines[0].ends_with("- Uncaught error: quota exceeded for alice [QuotaError(\"alice\")]"));
    }

    #[test]
    fn anyhow_body_records_root_cause_type() {
        let dir = tempfile::tempdir().unwrap();
        let session = open_session(dir.path());

        let _ = run_guarded(&session, || -> anyhow::Result<()> {
            Err(QuotaError("carol".into()).into())
        });

        let lines = error_lines(&session);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Uncaught error: quota exceeded for carol [QuotaError("));
        assert!(!lines[0].contains("anyhow::Error"));
    }

    #[test]
    fn error_chain_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let session = open_session(dir.path());

        let result: anyhow::Result<()> =
            Err(QuotaError("bob".into())).context("saving report");
        settle(&session, result);

        let lines = error_lines(&session);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("Uncaught error: saving report [QuotaError(\"bob\")]"));
        let content = std::fs::read_to_string(session.current_file()).unwrap();
        assert!(content.contains("Caused by:"));
        assert!(content.contains("quota exceeded for bob"));
    }

    #[test]
    fn interrupt_is_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let session = open_session(dir.path());

        let code = settle(&session, Err::<(), _>(Interrupted));

        assert_eq!(code, INTERRUPTED_EXIT_CODE);
        assert!(error_lines(&session).is_empty());
    }

    #[test]
    fn wrapped_interrupt_is_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let session = open_session(dir.path());

        let result: anyhow::Result<()> = Err(Interrupted).context("reading stdin");
        let code = settle(&session, result);

        assert_eq!(code, INTERRUPTED_EXIT_CODE);
        assert!(error_lines(&session).is_empty());
    }

    #[test]
    fn run_guarded_scopes_body_to_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = open_session(dir.path());

        let _ = run_guarded(&session, || {
            tracing::info!("inside the boundary");
            Ok::<(), anyhow::Error>(())
        });

        let content = std::fs::read_to_string(session.current_file()).unwrap();
        assert!(content.contains("inside the boundary"));
    }

    #[test]
    fn panic_report_with_location() {
        let payload: Box<dyn Any + Send> = Box::new("index out of range");
        let report = panic_report(
            "worker",
            payload.as_ref(),
            Some(Location::caller()),
            &Backtrace::disabled(),
        );

        assert!(report.starts_with("thread 'worker' panicked at "));
        assert!(report.contains("boundary.rs"));
        assert!(report.ends_with(":\nindex out of range"));
    }

    #[test]
    fn panic_report_formatted_payload() {
        let payload: Box<dyn Any + Send> = Box::new(format!("bad value {}", 7));
        let report = panic_report("main", payload.as_ref(), None, &Backtrace::disabled());
        assert_eq!(report, "thread 'main' panicked:\nbad value 7");
    }

    #[test]
    fn panic_report_opaque_payload() {
        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        let report = panic_report("main", payload.as_ref(), None, &Backtrace::disabled());
        assert!(report.ends_with("Box<dyn Any>"));
    }

    #[test]
    fn interrupt_payload_detection() {
        let interrupt: Box<dyn Any + Send> = Box::new(Interrupted);
        let other: Box<dyn Any + Send> = Box::new("boom");
        assert!(is_interrupt_payload(interrupt.as_ref()));
        assert!(!is_interrupt_payload(other.as_ref()));
    }
}

//! In-process check of the chaining panic hook.
//!
//! The hook is process-global, so this file holds a single test.

use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use ecjtu_core::boundary::{install_panic_hook, Interrupted};
use ecjtu_core::config::LoggingConfig;
use ecjtu_core::session::LogSession;
use ecjtu_storage::StorageResolver;

#[test]
fn hook_logs_panics_and_chains_to_previous_hook() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = StorageResolver::new(dir.path().join("home"), dir.path().join("tmp"));
    let session = LogSession::open(&resolver, &LoggingConfig::default()).unwrap();

    let previous_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&previous_calls);
    panic::set_hook(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    install_panic_hook(&session);

    let worker = thread::Builder::new()
        .name("worker".to_string())
        .spawn(|| panic!("worker exploded"))
        .unwrap();
    assert!(worker.join().is_err());

    let interrupted = thread::spawn(|| panic::panic_any(Interrupted));
    assert!(interrupted.join().is_err());

    assert_eq!(previous_calls.load(Ordering::SeqCst), 2);

    let content = std::fs::read_to_string(session.current_file()).unwrap();
    let errors: Vec<&str> = content
        .lines()
        .filter(|l| l.contains(" | ERROR | "))
        .collect();
    assert_eq!(errors.len(), 1, "log was:\n{content}");
    assert!(errors[0].contains("ecjtu:panic:"));
    assert!(errors[0].contains("Uncaught panic: thread 'worker' panicked at "));
    assert!(content.contains("worker exploded"));
}

//! Cooperative interrupt handling.
//!
//! Termination signals set a flag instead of killing the process. Long-running
//! commands poll it between units of work and stop with [`Interrupted`], which
//! the boundary treats as a clean user stop rather than a failure.

use crate::boundary::{Interrupted, INTERRUPTED_EXIT_CODE};
use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    /// A flag no signal is wired to. Useful in tests and for callers that
    /// raise it by hand.
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag raised by the termination signals (SIGINT, SIGTERM and, on
    /// Unix, SIGQUIT). A second signal while the flag is already raised exits
    /// immediately with the interrupt exit code, so a command stuck in a
    /// blocking read can still be stopped.
    pub fn register() -> io::Result<Self> {
        let interrupt = Self::new();
        for signal in TERM_SIGNALS {
            flag::register_conditional_shutdown(
                *signal,
                i32::from(INTERRUPTED_EXIT_CODE),
                Arc::clone(&interrupt.raised),
            )?;
            flag::register(*signal, Arc::clone(&interrupt.raised))?;
        }
        Ok(interrupt)
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once the flag is raised.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_raised() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_flag_is_clear() {
        let flag = InterruptFlag::new();
        assert!(!flag.is_raised());
        assert!(flag.check().is_ok());
    }

    #[test]
    fn raise_is_shared_between_clones() {
        let flag = InterruptFlag::new();
        let clone = flag.clone();

        clone.raise();

        assert!(flag.is_raised());
        assert_eq!(flag.check(), Err(Interrupted));
    }

    #[test]
    fn register_succeeds() {
        let flag = InterruptFlag::register().unwrap();
        assert!(!flag.is_raised());
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::process::ShutdownSignal;

/// Shutdown flag raised manually by a scenario, or after a number of checks.
#[derive(Debug, Clone, Default)]
pub struct TestShutdownSignal {
    raised: Arc<AtomicBool>,
    checks_left: Arc<AtomicUsize>,
}

impl TestShutdownSignal {
    pub fn triggered_now() -> Self {
        let signal = Self::default();
        signal.trigger();
        signal
    }

    /// Reports no shutdown for the first `checks` queries, then raises.
    pub fn triggered_after(checks: usize) -> Self {
        if checks == 0 {
            return Self::triggered_now();
        }
        let signal = Self::default();
        signal.checks_left.store(checks, Ordering::SeqCst);
        signal
    }

    pub fn trigger(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn triggered(&self) -> bool {
        if self.raised.load(Ordering::SeqCst) {
            return true;
        }
        let countdown = self
            .checks_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        if countdown == Ok(1) {
            self.trigger();
        }
        false
    }
}

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::flag;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Returns true once shutdown should proceed.
    fn triggered(&self) -> bool;
}

impl<T> ShutdownSignal for Arc<T>
where
    T: ShutdownSignal + ?Sized,
{
    fn triggered(&self) -> bool {
        (**self).triggered()
    }
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown flag raised by termination signals.
#[derive(Debug)]
pub struct SystemShutdownSignal {
    raised: Arc<AtomicBool>,
    announced: AtomicBool,
}

impl SystemShutdownSignal {
    /// Registers handlers for SIGTERM, SIGINT, SIGQUIT, and SIGHUP.
    pub fn install() -> Result<Self, ShutdownError> {
        let raised = Arc::new(AtomicBool::new(false));
        for signal in [SIGTERM, SIGINT, SIGQUIT, SIGHUP] {
            flag::register(signal, Arc::clone(&raised))
                .map_err(|source| ShutdownError::Install { source })?;
        }
        Ok(Self {
            raised,
            announced: AtomicBool::new(false),
        })
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn triggered(&self) -> bool {
        let raised = self.raised.load(Ordering::SeqCst);
        if raised && !self.announced.swap(true, Ordering::SeqCst) {
            info!(target: PROCESS_TARGET, "shutdown signal received");
        }
        raised
    }
}

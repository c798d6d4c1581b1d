//! Process lifecycle: launch sequencing, runtime artefacts, and signals.

mod errors;
mod guard;
pub(crate) mod launch;
mod shutdown;

pub use errors::{
    EXIT_ADDRESS, EXIT_CONFIG, EXIT_GATE_TIMEOUT, EXIT_INCOMPATIBLE, EXIT_INTERNAL,
    EXIT_UNAVAILABLE, EXIT_UNKNOWN_ROLE, EXIT_USAGE, LaunchError,
};
pub use launch::run;
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

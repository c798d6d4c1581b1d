//! Compatibility barrier between master boot and worker spawning.
//!
//! The probe runs on its own thread while the master waits on a bounded
//! receive. The continuation passed to [`CompatibilityGate::pass_then`] runs
//! only when the probe reports a version at or above the minimum; every other
//! outcome, including silence past the timeout, is a [`GateError`].

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use pool_config::RedisConfig;

use crate::store::{StoreError, StoreProbe, StoreVersion};

const GATE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::gate");

/// Reasons the gate refused to open.
#[derive(Debug, Error)]
pub enum GateError {
    /// The configured minimum version could not be parsed.
    #[error("invalid minimum data-store version: {source}")]
    InvalidMinimum {
        /// Parse failure.
        #[source]
        source: StoreError,
    },
    /// The probe failed to reach the store or read its version.
    #[error("data store unavailable: {source}")]
    Unreachable {
        /// Probe failure.
        #[source]
        source: StoreError,
    },
    /// The store answered with a version below the minimum.
    #[error("data store version {found} is older than the required {minimum}")]
    Incompatible {
        /// Version reported by the store.
        found: StoreVersion,
        /// Minimum accepted version.
        minimum: StoreVersion,
    },
    /// The probe thread could not be started.
    #[error("failed to start the store probe: {source}")]
    ProbeThread {
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// The probe thread ended without reporting a version.
    #[error("store probe stopped before reporting a version")]
    ProbeAborted,
    /// The probe did not answer in time.
    #[error("data-store compatibility check timed out after {}ms", timeout.as_millis())]
    TimedOut {
        /// Bound that expired.
        timeout: Duration,
    },
}

/// Version precondition that must hold before workers start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatibilityGate {
    minimum: StoreVersion,
    timeout: Duration,
}

impl CompatibilityGate {
    /// Builds a gate accepting `minimum` or newer within `timeout`.
    #[must_use]
    pub const fn new(minimum: StoreVersion, timeout: Duration) -> Self {
        Self { minimum, timeout }
    }

    /// Builds a gate from the `redis` configuration section.
    pub fn from_config(config: &RedisConfig) -> Result<Self, GateError> {
        let minimum = config
            .minimum_version
            .parse::<StoreVersion>()
            .map_err(|source| GateError::InvalidMinimum { source })?;
        Ok(Self::new(minimum, Duration::from_millis(config.gate_timeout_ms)))
    }

    /// Minimum accepted version.
    #[must_use]
    pub const fn minimum(&self) -> StoreVersion {
        self.minimum
    }

    /// Runs `probe`, then `continuation` when the store is compatible.
    ///
    /// The continuation receives the observed version and its result is
    /// returned unchanged. It never runs when the gate fails.
    pub fn pass_then<P, F, T>(&self, probe: P, continuation: F) -> Result<T, GateError>
    where
        P: StoreProbe + 'static,
        F: FnOnce(StoreVersion) -> T,
    {
        let version = self.await_version(probe)?;
        if version < self.minimum {
            return Err(GateError::Incompatible {
                found: version,
                minimum: self.minimum,
            });
        }
        debug!(
            target: GATE_TARGET,
            version = %version,
            minimum = %self.minimum,
            "data-store version accepted"
        );
        Ok(continuation(version))
    }

    fn await_version<P>(&self, probe: P) -> Result<StoreVersion, GateError>
    where
        P: StoreProbe + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(1);
        let spawned = thread::Builder::new()
            .name("store-probe".to_owned())
            .spawn(move || {
                // The receiver is gone once the gate has timed out.
                if sender.send(probe.server_version()).is_err() {
                    warn!(target: GATE_TARGET, "store probe answered after the gate closed");
                }
            });
        if let Err(source) = spawned {
            return Err(GateError::ProbeThread { source });
        }
        match receiver.recv_timeout(self.timeout) {
            Ok(Ok(version)) => Ok(version),
            Ok(Err(source)) => Err(GateError::Unreachable { source }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(GateError::ProbeAborted),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(GateError::TimedOut {
                timeout: self.timeout,
            }),
        }
    }
}

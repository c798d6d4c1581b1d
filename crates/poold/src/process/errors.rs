//! Defines the unified error surface for the supervisor process.

use std::io;
use std::path::PathBuf;
use std::time::SystemTimeError;

use nix::errno::Errno;
use thiserror::Error;

use pool_config::RuntimePathsError;

use crate::bootstrap::BootError;
use crate::dispatch::DispatchError;
use crate::gate::GateError;
use crate::selector::SelectorError;
use crate::topology::SpawnError;

use super::shutdown::ShutdownError;

/// Exit code for an invalid `-module=` argument.
pub const EXIT_USAGE: u8 = 64;
/// Exit code for a rejected operator address.
pub const EXIT_ADDRESS: u8 = 65;
/// Exit code for a worker bound to an unknown role.
pub const EXIT_UNKNOWN_ROLE: u8 = 66;
/// Exit code for an unreachable data store.
pub const EXIT_UNAVAILABLE: u8 = 69;
/// Exit code for internal and process-management failures.
pub const EXIT_INTERNAL: u8 = 70;
/// Exit code for a compatibility check that timed out.
pub const EXIT_GATE_TIMEOUT: u8 = 75;
/// Exit code for an incompatible data-store version.
pub const EXIT_INCOMPATIBLE: u8 = 76;
/// Exit code for configuration load failures.
pub const EXIT_CONFIG: u8 = 78;

/// Errors surfaced while booting or supervising a pool process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed before the process branched.
    #[error(transparent)]
    Boot(#[from] BootError),
    /// The module restriction was invalid.
    #[error(transparent)]
    Selector(#[from] SelectorError),
    /// The compatibility gate refused to open.
    #[error("compatibility check failed: {source}")]
    Gate {
        /// Underlying gate failure.
        #[source]
        source: GateError,
    },
    /// Worker dispatch failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// A worker could not be spawned.
    #[error("failed to start workers: {source}")]
    Spawn {
        /// Underlying spawn failure.
        #[source]
        source: SpawnError,
    },
    /// Installing signal handlers failed.
    #[error("failed to install shutdown handlers: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// The configured runtime directory was empty.
    #[error("runtime_dir must not be empty")]
    EmptyRuntimeDirectory,
    /// The runtime directory could not be created.
    #[error("failed to prepare runtime directory '{path}': {source}")]
    RuntimeDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Lock file creation failed.
    #[error("failed to create lock file '{path}': {source}")]
    LockCreate {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A live supervisor already holds the lock.
    #[error("pool supervisor already running with pid {pid}")]
    AlreadyRunning {
        /// PID recorded in the existing PID file.
        pid: u32,
    },
    /// Removing a stale runtime artefact failed.
    #[error("failed to remove stale file '{path}': {source}")]
    Cleanup {
        /// Path of the artefact that could not be removed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the PID file failed.
    #[error("failed to write pid file '{path}': {source}")]
    PidWrite {
        /// PID file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the health snapshot failed.
    #[error("failed to write health snapshot '{path}': {source}")]
    HealthWrite {
        /// Health file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialising the health snapshot failed.
    #[error("failed to serialise health snapshot: {source}")]
    HealthSerialise {
        /// Underlying serialisation error.
        #[from]
        source: serde_json::Error,
    },
    /// Obtaining the current timestamp failed.
    #[error("failed to read system time: {source}")]
    Clock {
        /// Underlying system time error.
        #[source]
        source: SystemTimeError,
    },
    /// Probing an existing PID failed.
    #[error("failed to check existing process {pid}: {source}")]
    CheckProcess {
        /// PID that failed to probe.
        pid: u32,
        /// Underlying OS error.
        source: Errno,
    },
    /// Health updates were attempted before writing the PID file.
    #[error("pid must be written before updating health state")]
    MissingPid,
}

impl LaunchError {
    /// Process exit status for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Boot(BootError::Configuration { .. } | BootError::Telemetry { .. })
            | Self::EmptyRuntimeDirectory
            | Self::Gate {
                source: GateError::InvalidMinimum { .. },
            } => EXIT_CONFIG,
            Self::Boot(BootError::Address(_)) => EXIT_ADDRESS,
            Self::Selector(_) => EXIT_USAGE,
            Self::Dispatch(DispatchError::UnknownRole { .. }) => EXIT_UNKNOWN_ROLE,
            Self::Gate {
                source: GateError::Unreachable { .. },
            } => EXIT_UNAVAILABLE,
            Self::Gate {
                source: GateError::TimedOut { .. },
            } => EXIT_GATE_TIMEOUT,
            Self::Gate {
                source: GateError::Incompatible { .. },
            } => EXIT_INCOMPATIBLE,
            Self::Boot(BootError::Store { .. })
            | Self::Gate {
                source: GateError::ProbeThread { .. } | GateError::ProbeAborted,
            }
            | Self::Dispatch(DispatchError::Exec { .. })
            | Self::Spawn { .. }
            | Self::Shutdown { .. }
            | Self::RuntimeDirectory { .. }
            | Self::LockCreate { .. }
            | Self::AlreadyRunning { .. }
            | Self::Cleanup { .. }
            | Self::PidWrite { .. }
            | Self::HealthWrite { .. }
            | Self::HealthSerialise { .. }
            | Self::Clock { .. }
            | Self::CheckProcess { .. }
            | Self::MissingPid => EXIT_INTERNAL,
        }
    }
}

impl From<GateError> for LaunchError {
    fn from(source: GateError) -> Self {
        Self::Gate { source }
    }
}

impl From<SpawnError> for LaunchError {
    fn from(source: SpawnError) -> Self {
        Self::Spawn { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

impl From<RuntimePathsError> for LaunchError {
    fn from(source: RuntimePathsError) -> Self {
        match source {
            RuntimePathsError::EmptyDirectory => Self::EmptyRuntimeDirectory,
            RuntimePathsError::RuntimeDirectory { path, source } => {
                Self::RuntimeDirectory { path, source }
            }
        }
    }
}

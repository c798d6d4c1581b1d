//! Structured health reporting for the boot sequence and worker lifecycle.

use std::fmt;
use std::sync::Arc;

use crate::process::LaunchError;
use crate::role::Role;
use crate::topology::{SpawnError, WorkerExit, WorkerSpec};

const MASTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::master");

/// Lifecycle states of the master process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MasterState {
    /// Loading configuration.
    Booting,
    /// Operator address accepted.
    ConfigValidated,
    /// Store handle created.
    StoreConnected,
    /// Module restriction resolved from the arguments.
    RestrictionResolved,
    /// Compatibility gate passed.
    GateSatisfied,
    /// Every planned worker has been spawned.
    RolesSpawned,
    /// Supervising workers.
    Steady,
    /// Shutting workers down.
    Stopping,
    /// Boot aborted by a fatal error.
    Terminated,
}

impl MasterState {
    /// Stable lower-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booting => "booting",
            Self::ConfigValidated => "config_validated",
            Self::StoreConnected => "store_connected",
            Self::RestrictionResolved => "restriction_resolved",
            Self::GateSatisfied => "gate_satisfied",
            Self::RolesSpawned => "roles_spawned",
            Self::Steady => "steady",
            Self::Stopping => "stopping",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for MasterState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked on every master state transition.
    fn state_changed(&self, state: MasterState);

    /// Invoked once when the developer donation is below the recommendation.
    fn dev_donation_advisory(&self, fee: f64);

    /// Invoked when a fatal error ends the process.
    fn boot_failed(&self, error: &LaunchError);

    /// Invoked when a worker process starts running its role.
    fn role_entered(&self, role: Role);

    /// Invoked after a worker process is spawned.
    fn worker_spawned(&self, spec: &WorkerSpec, pid: u32);

    /// Invoked when a worker process exits.
    fn worker_exited(&self, spec: &WorkerSpec, exit: WorkerExit);

    /// Invoked when replacing a worker fails.
    fn worker_spawn_failed(&self, error: &SpawnError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn state_changed(&self, state: MasterState) {
        (**self).state_changed(state);
    }

    fn dev_donation_advisory(&self, fee: f64) {
        (**self).dev_donation_advisory(fee);
    }

    fn boot_failed(&self, error: &LaunchError) {
        (**self).boot_failed(error);
    }

    fn role_entered(&self, role: Role) {
        (**self).role_entered(role);
    }

    fn worker_spawned(&self, spec: &WorkerSpec, pid: u32) {
        (**self).worker_spawned(spec, pid);
    }

    fn worker_exited(&self, spec: &WorkerSpec, exit: WorkerExit) {
        (**self).worker_exited(spec, exit);
    }

    fn worker_spawn_failed(&self, error: &SpawnError) {
        (**self).worker_spawn_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn state_changed(&self, state: MasterState) {
        tracing::info!(
            target: MASTER_TARGET,
            event = "state_changed",
            state = %state,
            "master state changed"
        );
    }

    fn dev_donation_advisory(&self, fee: f64) {
        tracing::info!(
            target: MASTER_TARGET,
            event = "dev_donation_advisory",
            dev_donation = fee,
            "Developer donation (fees.dev_donation) is set to {fee}%. Please consider raising it to 0.2% or higher"
        );
    }

    fn boot_failed(&self, error: &LaunchError) {
        tracing::error!(
            target: MASTER_TARGET,
            event = "boot_failed",
            exit_code = error.exit_code(),
            error = %error,
            "{error}"
        );
    }

    fn role_entered(&self, role: Role) {
        tracing::info!(
            target: MASTER_TARGET,
            event = "role_entered",
            role = %role,
            pid = std::process::id(),
            "worker entering role"
        );
    }

    fn worker_spawned(&self, spec: &WorkerSpec, pid: u32) {
        tracing::info!(
            target: MASTER_TARGET,
            event = "worker_spawned",
            worker = %spec,
            pid,
            "worker spawned"
        );
    }

    fn worker_exited(&self, spec: &WorkerSpec, exit: WorkerExit) {
        if exit.success() {
            tracing::info!(
                target: MASTER_TARGET,
                event = "worker_exited",
                worker = %spec,
                exit = %exit,
                "worker exited"
            );
        } else {
            tracing::error!(
                target: MASTER_TARGET,
                event = "worker_exited",
                worker = %spec,
                exit = %exit,
                "worker died"
            );
        }
    }

    fn worker_spawn_failed(&self, error: &SpawnError) {
        tracing::error!(
            target: MASTER_TARGET,
            event = "worker_spawn_failed",
            error = %error,
            "worker failed to start"
        );
    }
}

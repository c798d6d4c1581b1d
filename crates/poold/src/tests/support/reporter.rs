//! Test double for [`HealthReporter`] that records lifecycle events.

use std::sync::Mutex;

use crate::health::{HealthReporter, MasterState};
use crate::process::LaunchError;
use crate::role::Role;
use crate::topology::{SpawnError, WorkerExit, WorkerSpec};

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthEvent {
    State(MasterState),
    DevDonationAdvisory(f64),
    BootFailed { exit_code: u8, message: String },
    RoleEntered(Role),
    WorkerSpawned(WorkerSpec),
    WorkerExited(WorkerSpec, WorkerExit),
    WorkerSpawnFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn states(&self) -> Vec<MasterState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HealthEvent::State(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn advisories(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HealthEvent::DevDonationAdvisory(fee) => Some(fee),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn state_changed(&self, state: MasterState) {
        self.record(HealthEvent::State(state));
    }

    fn dev_donation_advisory(&self, fee: f64) {
        self.record(HealthEvent::DevDonationAdvisory(fee));
    }

    fn boot_failed(&self, error: &LaunchError) {
        self.record(HealthEvent::BootFailed {
            exit_code: error.exit_code(),
            message: error.to_string(),
        });
    }

    fn role_entered(&self, role: Role) {
        self.record(HealthEvent::RoleEntered(role));
    }

    fn worker_spawned(&self, spec: &WorkerSpec, _pid: u32) {
        self.record(HealthEvent::WorkerSpawned(spec.clone()));
    }

    fn worker_exited(&self, spec: &WorkerSpec, exit: WorkerExit) {
        self.record(HealthEvent::WorkerExited(spec.clone(), exit));
    }

    fn worker_spawn_failed(&self, error: &SpawnError) {
        self.record(HealthEvent::WorkerSpawnFailed(error.to_string()));
    }
}

//! Worker spawner double whose children exit on command.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::io;

use crate::role::Role;
use crate::topology::{SpawnError, WorkerChild, WorkerExit, WorkerSpawner, WorkerSpec};

#[derive(Debug, Default)]
struct ChildState {
    exit: Mutex<Option<WorkerExit>>,
}

impl ChildState {
    fn finish(&self, exit: WorkerExit) {
        let mut slot = self.exit.lock().expect("child mutex poisoned");
        if slot.is_none() {
            *slot = Some(exit);
        }
    }
}

struct FakeChild {
    pid: u32,
    state: Arc<ChildState>,
}

impl WorkerChild for FakeChild {
    fn id(&self) -> u32 {
        self.pid
    }

    fn try_wait(&mut self) -> io::Result<Option<WorkerExit>> {
        Ok(*self.state.exit.lock().expect("child mutex poisoned"))
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.state.finish(WorkerExit::Signal(15));
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.state.finish(WorkerExit::Signal(9));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Ledger {
    spawned: Vec<WorkerSpec>,
    children: Vec<Arc<ChildState>>,
    failing: Option<Role>,
}

/// Records spawned specs and hands out controllable children.
#[derive(Debug, Clone, Default)]
pub struct RecordingSpawner {
    ledger: Arc<Mutex<Ledger>>,
    next_pid: Arc<AtomicU32>,
}

impl RecordingSpawner {
    pub fn spawned(&self) -> Vec<WorkerSpec> {
        self.ledger().spawned.clone()
    }

    pub fn spawned_roles(&self) -> Vec<Role> {
        self.spawned().iter().map(WorkerSpec::role).collect()
    }

    /// Makes every later spawn of `role` fail.
    pub fn fail_role(&self, role: Option<Role>) {
        self.ledger().failing = role;
    }

    /// Ends the most recent incarnation of `spec`.
    pub fn exit_worker(&self, spec: &WorkerSpec, exit: WorkerExit) {
        let ledger = self.ledger();
        let child = ledger
            .spawned
            .iter()
            .zip(&ledger.children)
            .rev()
            .find(|(spawned, _)| *spawned == spec)
            .map(|(_, child)| Arc::clone(child))
            .expect("worker was spawned");
        drop(ledger);
        child.finish(exit);
    }

    pub fn live_children(&self) -> usize {
        self.ledger()
            .children
            .iter()
            .filter(|child| child.exit.lock().expect("child mutex poisoned").is_none())
            .count()
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().expect("spawner mutex poisoned")
    }
}

impl WorkerSpawner for RecordingSpawner {
    fn spawn(&mut self, spec: &WorkerSpec) -> Result<Box<dyn WorkerChild>, SpawnError> {
        let mut ledger = self.ledger();
        if ledger.failing == Some(spec.role()) {
            return Err(SpawnError::Launch {
                spec: spec.clone(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }
        let state = Arc::new(ChildState::default());
        ledger.spawned.push(spec.clone());
        ledger.children.push(Arc::clone(&state));
        let pid = 10_000 + self.next_pid.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeChild { pid, state }))
    }
}

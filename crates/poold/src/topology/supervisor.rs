//! Owns the worker processes: spawn, observe exits, restart, shut down.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use pool_config::SupervisorConfig;

use crate::health::HealthReporter;
use crate::process::ShutdownSignal;
use crate::role::Role;

use super::TOPOLOGY_TARGET;
use super::plan::{ActivationPlan, WorkerSpec};
use super::spawner::{SpawnError, WorkerChild, WorkerExit, WorkerSpawner};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const KILL_GRACE: Duration = Duration::from_secs(1);

/// Timings applied by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorTimings {
    /// Delay before an exited worker is replaced.
    pub restart_delay: Duration,
    /// Pause between consecutive work-server spawns.
    pub spawn_interval: Duration,
    /// Grace period after SIGTERM before workers are killed.
    pub shutdown_timeout: Duration,
    /// Interval between exit polls.
    pub poll_interval: Duration,
}

impl SupervisorTimings {
    /// Reads timings from the `supervisor` configuration section.
    #[must_use]
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            restart_delay: Duration::from_millis(config.restart_delay_ms),
            spawn_interval: Duration::from_millis(config.spawn_interval_ms),
            shutdown_timeout: Duration::from_millis(config.shutdown_timeout_ms),
            poll_interval: POLL_INTERVAL,
        }
    }
}

impl Default for SupervisorTimings {
    fn default() -> Self {
        Self::from_config(&SupervisorConfig::default())
    }
}

/// One supervised worker. Its [`WorkerSpec`] never changes across restarts.
pub struct WorkerProcessHandle {
    spec: WorkerSpec,
    child: Option<Box<dyn WorkerChild>>,
    exited_at: Option<Instant>,
    restarts: u32,
}

impl WorkerProcessHandle {
    fn new(spec: WorkerSpec, child: Box<dyn WorkerChild>) -> Self {
        Self {
            spec,
            child: Some(child),
            exited_at: None,
            restarts: 0,
        }
    }

    /// Worker role and instance metadata.
    #[must_use]
    pub fn spec(&self) -> &WorkerSpec {
        &self.spec
    }

    /// Process id of the current incarnation, if running.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(|child| child.id())
    }

    /// Returns true while a process is attached.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Number of times the worker has been replaced.
    #[must_use]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    fn restart_due(&self, now: Instant, delay: Duration) -> bool {
        self.child.is_none()
            && self
                .exited_at
                .is_some_and(|exited| now.saturating_duration_since(exited) >= delay)
    }
}

/// Process manager for the activated topology.
pub struct TopologySupervisor<S> {
    spawner: S,
    reporter: Arc<dyn HealthReporter>,
    timings: SupervisorTimings,
    workers: Vec<WorkerProcessHandle>,
}

impl<S> TopologySupervisor<S>
where
    S: WorkerSpawner,
{
    /// Builds a supervisor with no workers.
    pub fn new(spawner: S, reporter: Arc<dyn HealthReporter>, timings: SupervisorTimings) -> Self {
        Self {
            spawner,
            reporter,
            timings,
            workers: Vec::new(),
        }
    }

    /// Spawns every worker in the plan, in order.
    ///
    /// Consecutive work servers are separated by the spawn interval. When a
    /// spawn fails the workers started so far are shut down and the error is
    /// returned.
    pub fn spawn_all(&mut self, plan: &ActivationPlan) -> Result<usize, SpawnError> {
        let mut previous: Option<Role> = None;
        for spec in plan.specs() {
            if spec.role() == Role::WorkServer
                && previous == Some(Role::WorkServer)
                && !self.timings.spawn_interval.is_zero()
            {
                thread::sleep(self.timings.spawn_interval);
            }
            previous = Some(spec.role());
            match self.spawner.spawn(spec) {
                Ok(child) => {
                    self.reporter.worker_spawned(spec, child.id());
                    self.workers.push(WorkerProcessHandle::new(spec.clone(), child));
                }
                Err(error) => {
                    self.shutdown();
                    return Err(error);
                }
            }
        }
        Ok(self.workers.len())
    }

    /// Collects workers that have exited since the last poll.
    pub fn poll_exits(&mut self) -> Vec<(WorkerSpec, WorkerExit)> {
        let now = Instant::now();
        let mut exited = Vec::new();
        for handle in &mut self.workers {
            let Some(child) = handle.child.as_mut() else {
                continue;
            };
            match child.try_wait() {
                Ok(Some(exit)) => {
                    self.reporter.worker_exited(&handle.spec, exit);
                    handle.child = None;
                    handle.exited_at = Some(now);
                    exited.push((handle.spec.clone(), exit));
                }
                Ok(None) => {}
                Err(error) => warn!(
                    target: TOPOLOGY_TARGET,
                    worker = %handle.spec,
                    error = %error,
                    "failed to poll worker"
                ),
            }
        }
        exited
    }

    /// Respawns every exited worker whose restart delay has elapsed.
    ///
    /// Returns the number of workers replaced. A failed respawn is reported
    /// and retried after another delay.
    pub fn restart_due(&mut self, now: Instant) -> usize {
        let delay = self.timings.restart_delay;
        let mut restarted = 0;
        for handle in &mut self.workers {
            if !handle.restart_due(now, delay) {
                continue;
            }
            match self.spawner.spawn(&handle.spec) {
                Ok(child) => {
                    self.reporter.worker_spawned(&handle.spec, child.id());
                    handle.child = Some(child);
                    handle.exited_at = None;
                    handle.restarts += 1;
                    restarted += 1;
                }
                Err(error) => {
                    self.reporter.worker_spawn_failed(&error);
                    handle.exited_at = Some(now);
                }
            }
        }
        restarted
    }

    /// Supervises workers until `shutdown` triggers.
    pub fn supervise(&mut self, shutdown: &dyn ShutdownSignal) {
        info!(
            target: TOPOLOGY_TARGET,
            workers = self.workers.len(),
            "supervising workers"
        );
        while !shutdown.triggered() {
            self.poll_exits();
            self.restart_due(Instant::now());
            thread::sleep(self.timings.poll_interval);
        }
    }

    /// Stops every worker: SIGTERM, then SIGKILL after the grace period.
    pub fn shutdown(&mut self) {
        for handle in &mut self.workers {
            handle.exited_at = None;
            if let Some(child) = handle.child.as_mut()
                && let Err(error) = child.terminate()
            {
                warn!(
                    target: TOPOLOGY_TARGET,
                    worker = %handle.spec,
                    error = %error,
                    "failed to signal worker"
                );
            }
        }
        self.reap_until(Instant::now() + self.timings.shutdown_timeout);
        if self.running() == 0 {
            return;
        }

        for handle in &mut self.workers {
            if let Some(child) = handle.child.as_mut() {
                debug!(
                    target: TOPOLOGY_TARGET,
                    worker = %handle.spec,
                    "killing worker after shutdown timeout"
                );
                if let Err(error) = child.kill() {
                    warn!(
                        target: TOPOLOGY_TARGET,
                        worker = %handle.spec,
                        error = %error,
                        "failed to kill worker"
                    );
                }
            }
        }
        self.reap_until(Instant::now() + KILL_GRACE);
        // Anything left is abandoned to init.
        for handle in &mut self.workers {
            handle.child = None;
        }
    }

    fn reap_until(&mut self, deadline: Instant) {
        loop {
            self.poll_exits();
            for handle in &mut self.workers {
                handle.exited_at = None;
            }
            if self.running() == 0 || Instant::now() >= deadline {
                return;
            }
            thread::sleep(self.timings.poll_interval);
        }
    }

    /// Number of workers with a live process.
    #[must_use]
    pub fn running(&self) -> usize {
        self.workers
            .iter()
            .filter(|handle| handle.is_running())
            .count()
    }

    /// Supervised workers.
    #[must_use]
    pub fn workers(&self) -> &[WorkerProcessHandle] {
        &self.workers
    }

    /// Spawner used by the supervisor.
    #[must_use]
    pub fn spawner(&self) -> &S {
        &self.spawner
    }
}

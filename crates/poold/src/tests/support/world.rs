//! Scenario world driving whole launches of the master or a worker.

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::dispatch::ProcessKind;
use crate::health::HealthReporter;
use crate::process::LaunchError;
use crate::process::launch::{LaunchPlan, MasterDeps, ServiceDeps, run_with};
use crate::topology::{CHILD_POOL_ENV_VAR, FORK_ID_ENV_VAR, ROLE_ENV_VAR};

use super::{
    RecordingConnector, RecordingEntryPoint, RecordingHealthReporter, RecordingSpawner,
    TestConfigLoader, TestShutdownSignal,
};

const WAIT_TIMEOUT: Duration = Duration::from_secs(3);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub type StepResult = Result<(), String>;

/// Collaborators and outcome of one launch.
pub struct LaunchWorld {
    pub loader: TestConfigLoader,
    pub reporter: Arc<RecordingHealthReporter>,
    pub connector: RecordingConnector,
    pub spawner: RecordingSpawner,
    pub entry: RecordingEntryPoint,
    pub shutdown: TestShutdownSignal,
    pub args: Vec<OsString>,
    /// Shutdown queries answered negatively by [`Self::run_to_completion`].
    pub quiet_shutdown_checks: usize,
    pub bindings: Vec<(&'static str, String)>,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
    result: Option<Result<(), LaunchError>>,
}

impl LaunchWorld {
    pub fn new() -> Self {
        Self {
            loader: TestConfigLoader::new(),
            reporter: Arc::new(RecordingHealthReporter::default()),
            connector: RecordingConnector::default(),
            spawner: RecordingSpawner::default(),
            entry: RecordingEntryPoint::default(),
            shutdown: TestShutdownSignal::default(),
            args: Vec::new(),
            quiet_shutdown_checks: 1,
            bindings: Vec::new(),
            handle: None,
            result: None,
        }
    }

    pub fn bind_role(&mut self, token: &str) {
        self.bindings.push((ROLE_ENV_VAR, token.to_owned()));
    }

    pub fn bind_fork(&mut self, fork_id: usize) {
        self.bindings.push((FORK_ID_ENV_VAR, fork_id.to_string()));
    }

    pub fn bind_child_pool(&mut self, pool: &str) {
        self.bindings.push((CHILD_POOL_ENV_VAR, pool.to_owned()));
    }

    fn plan(
        &self,
        shutdown: TestShutdownSignal,
    ) -> LaunchPlan<
        TestConfigLoader,
        RecordingConnector,
        RecordingSpawner,
        TestShutdownSignal,
        RecordingEntryPoint,
    > {
        let bindings = self.bindings.clone();
        let kind = ProcessKind::from_lookup(move |key| {
            bindings
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.clone())
        });
        LaunchPlan {
            kind,
            services: ServiceDeps {
                loader: self.loader.clone(),
                reporter: Arc::clone(&self.reporter) as Arc<dyn HealthReporter>,
                connector: self.connector.clone(),
            },
            master: MasterDeps {
                args: self.args.clone(),
                spawner: self.spawner.clone(),
                shutdown,
            },
            entry: self.entry.clone(),
        }
    }

    /// Runs on the current thread; shutdown is requested once the master
    /// has checked the signal `quiet_shutdown_checks` times.
    pub fn run_to_completion(&mut self) -> StepResult {
        if self.result.is_some() {
            return Err("launch already ran".to_owned());
        }
        let shutdown = TestShutdownSignal::triggered_after(self.quiet_shutdown_checks);
        let result = run_with(self.plan(shutdown));
        self.result = Some(result);
        Ok(())
    }

    pub fn start_background(&mut self) -> StepResult {
        if self.handle.is_some() {
            return Err("launch already running".to_owned());
        }
        let plan = self.plan(self.shutdown.clone());
        self.handle = Some(thread::spawn(move || run_with(plan)));
        Ok(())
    }

    pub fn join_background(&mut self) -> StepResult {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| "launch not running".to_owned())?;
        let result = handle
            .join()
            .map_err(|_| "launch thread panicked".to_owned())?;
        self.result = Some(result);
        Ok(())
    }

    pub fn result(&self) -> Result<&Result<(), LaunchError>, String> {
        self.result
            .as_ref()
            .ok_or_else(|| "no launch result recorded".to_owned())
    }

    pub fn runtime_file(&self, name: &str) -> PathBuf {
        self.loader.runtime_dir().join(name)
    }

    /// Polls the health snapshot until it reports `status`.
    pub fn wait_for_health(&self, status: &str) -> Result<Value, String> {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            if let Ok(content) = fs::read_to_string(self.runtime_file("poold.health"))
                && let Ok(snapshot) = serde_json::from_str::<Value>(&content)
                && snapshot.get("status").and_then(Value::as_str) == Some(status)
            {
                return Ok(snapshot);
            }
            if Instant::now() >= deadline {
                return Err(format!("health never reported {status}"));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for LaunchWorld {
    fn drop(&mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

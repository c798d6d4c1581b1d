//! Launches worker processes bound to a role.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use thiserror::Error;

use super::plan::WorkerSpec;

/// Environment variable carrying the role token into a worker.
pub const ROLE_ENV_VAR: &str = "POOLD_WORKER_ROLE";
/// Environment variable carrying a work-server's fork id.
pub const FORK_ID_ENV_VAR: &str = "POOLD_FORK_ID";
/// Environment variable carrying a child watcher's pool id.
pub const CHILD_POOL_ENV_VAR: &str = "POOLD_CHILD_POOL";

/// Errors raised while launching or signalling workers.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The current executable could not be resolved.
    #[error("failed to resolve the supervisor executable: {source}")]
    CurrentExe {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Starting the worker process failed.
    #[error("failed to spawn {spec} worker: {source}")]
    Launch {
        /// Worker that failed to start.
        spec: WorkerSpec,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// How a worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Exited with a status code.
    Code(i32),
    /// Terminated by a signal.
    Signal(i32),
}

impl WorkerExit {
    /// Returns true for a zero exit code.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Code(0))
    }
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => Self::Code(code),
            (None, Some(signal)) => Self::Signal(signal),
            (None, None) => Self::Code(-1),
        }
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(formatter, "exit code {code}"),
            Self::Signal(signal) => write!(formatter, "signal {signal}"),
        }
    }
}

/// A running worker process.
pub trait WorkerChild: Send {
    /// Operating-system process id.
    fn id(&self) -> u32;

    /// Returns the exit state when the process has ended.
    fn try_wait(&mut self) -> io::Result<Option<WorkerExit>>;

    /// Asks the process to stop.
    fn terminate(&mut self) -> io::Result<()>;

    /// Forcibly stops the process.
    fn kill(&mut self) -> io::Result<()>;
}

/// Starts worker processes.
pub trait WorkerSpawner: Send {
    /// Launches one worker bound to `spec`.
    fn spawn(&mut self, spec: &WorkerSpec) -> Result<Box<dyn WorkerChild>, SpawnError>;
}

/// Spawner that re-executes a supervisor binary in worker mode.
///
/// Workers receive the master's original arguments so they load the same
/// configuration file, plus the role binding in the environment.
#[derive(Debug, Clone)]
pub struct ExecSpawner {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExecSpawner {
    /// Builds a spawner for `program`, forwarding `args` (without argv\[0\]).
    #[must_use]
    pub fn new(program: PathBuf, args: Vec<OsString>) -> Self {
        Self { program, args }
    }

    /// Builds a spawner for the running executable.
    pub fn current(argv: &[OsString]) -> Result<Self, SpawnError> {
        let program = std::env::current_exe().map_err(|source| SpawnError::CurrentExe { source })?;
        Ok(Self::new(program, argv.iter().skip(1).cloned().collect()))
    }

    fn command(&self, spec: &WorkerSpec) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(ROLE_ENV_VAR, spec.role().token())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        match spec.fork_id() {
            Some(fork_id) => command.env(FORK_ID_ENV_VAR, fork_id.to_string()),
            None => command.env_remove(FORK_ID_ENV_VAR),
        };
        match spec.child_pool() {
            Some(pool) => command.env(CHILD_POOL_ENV_VAR, pool),
            None => command.env_remove(CHILD_POOL_ENV_VAR),
        };
        command
    }
}

impl WorkerSpawner for ExecSpawner {
    fn spawn(&mut self, spec: &WorkerSpec) -> Result<Box<dyn WorkerChild>, SpawnError> {
        let child = self
            .command(spec)
            .spawn()
            .map_err(|source| SpawnError::Launch {
                spec: spec.clone(),
                source,
            })?;
        Ok(Box::new(ProcessChild { child }))
    }
}

/// [`WorkerChild`] backed by an OS process.
#[derive(Debug)]
pub struct ProcessChild {
    child: Child,
}

impl ProcessChild {
    fn pid(&self) -> io::Result<Pid> {
        i32::try_from(self.child.id())
            .map(Pid::from_raw)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))
    }
}

impl WorkerChild for ProcessChild {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<WorkerExit>> {
        Ok(self.child.try_wait()?.map(WorkerExit::from))
    }

    fn terminate(&mut self) -> io::Result<()> {
        kill(self.pid()?, Signal::SIGTERM).map_err(io::Error::from)
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.kill()
    }
}

//! Worker topology: which processes run, and the manager that keeps them up.

mod plan;
mod spawner;
mod supervisor;

pub use plan::{ActivationPlan, WorkerSpec};
pub use spawner::{
    CHILD_POOL_ENV_VAR, ExecSpawner, FORK_ID_ENV_VAR, ProcessChild, ROLE_ENV_VAR, SpawnError,
    WorkerChild, WorkerExit, WorkerSpawner,
};
pub use supervisor::{SupervisorTimings, TopologySupervisor, WorkerProcessHandle};

pub(crate) const TOPOLOGY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::topology");

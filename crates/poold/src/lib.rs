//! Supervisor for a cryptonote mining pool.
//!
//! One binary plays every part. Started without a role binding it is the
//! master: it loads the shared configuration, rejects a missing or malformed
//! operator address, creates its data-store handle, and then works out which
//! roles to run. A `-module=<name>` argument narrows the topology to a single
//! role. Before any worker starts, a [`CompatibilityGate`] checks the data
//! store's server version; only a compatible answer lets the
//! [`TopologySupervisor`] spawn the workers, which it then restarts when they
//! exit and stops on shutdown.
//!
//! Workers are the same executable re-launched with their role in the
//! environment. They repeat the shared boot (configuration, address check,
//! their own store handle) and hand control to the [`RoleEntryPoint`] for
//! their role exactly once.

mod bootstrap;
mod dispatch;
mod gate;
mod health;
mod process;
mod role;
mod selector;
mod store;
mod telemetry;
mod topology;
mod validate;

pub use bootstrap::{
    BootContext, BootError, ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use dispatch::{
    CommandEntryPoint, DispatchError, ProcessKind, RoleEntryPoint, WorkerBinding, WorkerContext,
    dispatch_worker,
};
pub use gate::{CompatibilityGate, GateError};
pub use health::{HealthReporter, MasterState, StructuredHealthReporter};
pub use process::{
    EXIT_ADDRESS, EXIT_CONFIG, EXIT_GATE_TIMEOUT, EXIT_INCOMPATIBLE, EXIT_INTERNAL,
    EXIT_UNAVAILABLE, EXIT_UNKNOWN_ROLE, EXIT_USAGE, LaunchError, ShutdownError, ShutdownSignal,
    SystemShutdownSignal, run,
};
pub use role::{ModuleRestriction, Role, RoleParseError, RoleToken};
pub use selector::{SelectorError, config_path_argument, select_module};
pub use store::{
    RedisConnector, RedisProbe, StoreConnector, StoreError, StoreHandle, StoreParams, StoreProbe,
    StoreVersion, parse_server_version,
};
pub use telemetry::{TelemetryError, TelemetryHandle, is_initialised as telemetry_initialised};
pub use topology::{
    ActivationPlan, CHILD_POOL_ENV_VAR, ExecSpawner, FORK_ID_ENV_VAR, ProcessChild, ROLE_ENV_VAR,
    SpawnError, SupervisorTimings, TopologySupervisor, WorkerChild, WorkerExit,
    WorkerProcessHandle, WorkerSpawner, WorkerSpec,
};
pub use validate::{AddressError, POOL_ADDRESS_KEY, dev_donation_advisory, validate_pool_address};

#[cfg(test)]
mod tests;

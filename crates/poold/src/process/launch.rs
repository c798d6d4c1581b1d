//! Launch sequencing for the master and its workers.

use std::env;
use std::ffi::OsString;
use std::sync::Arc;

use tracing::info;

use pool_config::RuntimePaths;

use crate::bootstrap::{BootContext, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::{CommandEntryPoint, ProcessKind, RoleEntryPoint, dispatch_worker};
use crate::gate::CompatibilityGate;
use crate::health::{HealthReporter, MasterState, StructuredHealthReporter};
use crate::selector::{config_path_argument, select_module};
use crate::store::{RedisConnector, StoreConnector};
use crate::topology::{
    ActivationPlan, ExecSpawner, SupervisorTimings, TopologySupervisor, WorkerSpawner,
};
use crate::validate::dev_donation_advisory;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::guard::{HealthState, ProcessGuard};
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Services shared by the master and every worker.
pub(crate) struct ServiceDeps<L, C> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) connector: C,
}

/// Collaborators used only by the master.
pub(crate) struct MasterDeps<W, S> {
    pub(crate) args: Vec<OsString>,
    pub(crate) spawner: W,
    pub(crate) shutdown: S,
}

/// Collaborators required to run one pool process.
pub(crate) struct LaunchPlan<L, C, W, S, E> {
    pub(crate) kind: ProcessKind,
    pub(crate) services: ServiceDeps<L, C>,
    pub(crate) master: MasterDeps<W, S>,
    pub(crate) entry: E,
}

/// Runs the current process as master or worker using production
/// collaborators.
pub fn run() -> Result<(), LaunchError> {
    let argv: Vec<OsString> = env::args_os().collect();
    let args = argv.iter().skip(1).cloned().collect::<Vec<_>>();
    let shutdown = Arc::new(SystemShutdownSignal::install()?);
    let plan = LaunchPlan {
        kind: ProcessKind::detect(),
        services: ServiceDeps {
            loader: SystemConfigLoader::new(config_path_argument(args.iter().cloned())),
            reporter: Arc::new(StructuredHealthReporter::new()),
            connector: RedisConnector,
        },
        master: MasterDeps {
            args,
            spawner: ExecSpawner::current(&argv)?,
            shutdown: Arc::clone(&shutdown),
        },
        entry: CommandEntryPoint::new(shutdown),
    };
    run_with(plan)
}

/// Runs one pool process with injected collaborators.
///
/// Fatal errors are reported before being returned.
pub(crate) fn run_with<L, C, W, S, E>(plan: LaunchPlan<L, C, W, S, E>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    C: StoreConnector,
    W: WorkerSpawner,
    S: ShutdownSignal,
    E: RoleEntryPoint,
{
    let LaunchPlan {
        kind,
        services,
        master,
        entry,
    } = plan;
    let ServiceDeps {
        loader,
        reporter,
        connector,
    } = services;

    let result = bootstrap_with(&loader, Arc::clone(&reporter), &connector)
        .map_err(LaunchError::from)
        .and_then(|context| match &kind {
            ProcessKind::Worker(binding) => {
                dispatch_worker(binding, &context, &entry).map_err(LaunchError::from)
            }
            ProcessKind::Master => run_master(&context, &connector, master),
        });
    if let Err(error) = &result {
        reporter.boot_failed(error);
        if kind == ProcessKind::Master {
            reporter.state_changed(MasterState::Terminated);
        }
    }
    result
}

fn run_master<C, W, S>(
    context: &BootContext,
    connector: &C,
    master: MasterDeps<W, S>,
) -> Result<(), LaunchError>
where
    C: StoreConnector,
    W: WorkerSpawner,
    S: ShutdownSignal,
{
    let MasterDeps {
        args,
        spawner,
        shutdown,
    } = master;
    let config = context.config();
    let reporter = context.reporter();

    if let Some(fee) = dev_donation_advisory(config.fees.dev_donation) {
        reporter.dev_donation_advisory(fee);
    }
    let restriction = select_module(args)?;
    if let Some(module) = restriction {
        info!(
            target: PROCESS_TARGET,
            module = %module,
            "Running in single module mode"
        );
    }
    reporter.state_changed(MasterState::RestrictionResolved);

    let gate = CompatibilityGate::from_config(&config.redis)?;
    let plan = ActivationPlan::resolve(config, restriction);
    let mut guard = ProcessGuard::acquire(RuntimePaths::from_config(config)?)?;
    guard.write_pid(std::process::id())?;
    guard.write_health(HealthState::Starting, 0)?;

    let mut supervisor = TopologySupervisor::new(
        spawner,
        Arc::clone(reporter),
        SupervisorTimings::from_config(&config.supervisor),
    );
    let spawned = gate.pass_then(connector.probe(context.store()), |version| {
        reporter.state_changed(MasterState::GateSatisfied);
        if shutdown.triggered() {
            info!(
                target: PROCESS_TARGET,
                "shutdown requested before workers started"
            );
            return Ok(None);
        }
        info!(
            target: PROCESS_TARGET,
            version = %version,
            workers = plan.len(),
            "data store compatible; starting workers"
        );
        supervisor.spawn_all(&plan).map(Some)
    })??;

    let steady = match spawned {
        Some(spawned) => {
            reporter.state_changed(MasterState::RolesSpawned);
            guard.write_health(HealthState::Ready, spawned).map(|()| {
                reporter.state_changed(MasterState::Steady);
                supervisor.supervise(&shutdown);
            })
        }
        None => Ok(()),
    };

    reporter.state_changed(MasterState::Stopping);
    let stopping = guard.write_health(HealthState::Stopping, supervisor.running());
    supervisor.shutdown();
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    steady.and(stopping)
}

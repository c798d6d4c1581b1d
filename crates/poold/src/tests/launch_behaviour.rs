//! Behavioural tests covering master boot, gating, and worker dispatch.

use std::ffi::OsString;
use std::fs;
use std::str::FromStr;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::health::MasterState;
use crate::role::Role;
use crate::store::StoreVersion;
use crate::tests::support::{LaunchWorld, ProbeBehaviour, StepResult};

/// A quoted string value from a Gherkin feature file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QuotedString(String);

impl FromStr for QuotedString {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim_matches('"').to_owned()))
    }
}

impl QuotedString {
    fn as_str(&self) -> &str {
        &self.0
    }
}

#[fixture]
fn world() -> LaunchWorld {
    LaunchWorld::new()
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a pool configuration with every role enabled")]
fn given_full_configuration(world: &mut LaunchWorld) {
    let _ = world;
}

#[given("the pool address is {address}")]
fn given_pool_address(world: &mut LaunchWorld, address: QuotedString) {
    world.loader.config_mut().pool_server.pool_address = address.as_str().to_owned();
}

#[given("the developer donation is {fee}")]
fn given_dev_donation(world: &mut LaunchWorld, fee: f64) {
    world.loader.config_mut().fees.dev_donation = fee;
}

#[given("the data store never answers")]
fn given_silent_store(world: &mut LaunchWorld) {
    world.connector.set_behaviour(ProbeBehaviour::Silent);
}

#[given("the data store is unreachable")]
fn given_unreachable_store(world: &mut LaunchWorld) {
    world.connector.set_behaviour(ProbeBehaviour::Unreachable);
}

#[given("the data store reports version {version}")]
fn given_store_version(world: &mut LaunchWorld, version: QuotedString) -> StepResult {
    let version = version
        .as_str()
        .parse::<StoreVersion>()
        .map_err(|error| error.to_string())?;
    world.connector.set_behaviour(ProbeBehaviour::Answer(version));
    Ok(())
}

#[given("shutdown is requested while the data store is checked")]
fn given_early_shutdown(world: &mut LaunchWorld) {
    world.quiet_shutdown_checks = 0;
}

#[given("the process is bound to role {token}")]
fn given_role_binding(world: &mut LaunchWorld, token: QuotedString) {
    world.bind_role(token.as_str());
}

#[given("the binding carries fork id {fork_id}")]
fn given_fork_binding(world: &mut LaunchWorld, fork_id: usize) {
    world.bind_fork(fork_id);
}

#[given("the binding carries child pool {pool}")]
fn given_child_pool_binding(world: &mut LaunchWorld, pool: QuotedString) {
    world.bind_child_pool(pool.as_str());
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the process runs to completion")]
fn when_runs(world: &mut LaunchWorld) -> StepResult {
    world.run_to_completion()
}

#[when("the process runs to completion with arguments {args}")]
fn when_runs_with_arguments(world: &mut LaunchWorld, args: QuotedString) -> StepResult {
    world.args = args.as_str().split_whitespace().map(OsString::from).collect();
    world.run_to_completion()
}

#[when("the master starts in the background")]
fn when_master_starts(world: &mut LaunchWorld) -> StepResult {
    world.start_background()
}

#[when("shutdown is requested")]
fn when_shutdown_requested(world: &mut LaunchWorld) {
    world.shutdown.trigger();
}

#[when("the master run completes")]
fn when_master_completes(world: &mut LaunchWorld) -> StepResult {
    world.join_background()
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the run succeeds")]
fn then_run_succeeds(world: &mut LaunchWorld) -> StepResult {
    match world.result()? {
        Ok(()) => Ok(()),
        Err(error) => Err(format!("launch failed: {error}")),
    }
}

#[then("the launch fails with exit code {code}")]
fn then_launch_fails(world: &mut LaunchWorld, code: u8) -> StepResult {
    let error = match world.result()? {
        Ok(()) => return Err("launch unexpectedly succeeded".to_owned()),
        Err(error) => error,
    };
    if error.exit_code() != code {
        return Err(format!("expected exit code {code}, got {}: {error}", error.exit_code()));
    }
    Ok(())
}

#[then("every role was spawned exactly once")]
fn then_every_role_once(world: &mut LaunchWorld) {
    let mut roles = world.spawner.spawned_roles();
    roles.sort();
    assert_eq!(roles, Role::ALL.to_vec());
}

#[then("only the {token} role was spawned")]
fn then_only_role(world: &mut LaunchWorld, token: QuotedString) -> StepResult {
    let role = token
        .as_str()
        .parse::<Role>()
        .map_err(|error| error.to_string())?;
    assert_eq!(world.spawner.spawned_roles(), vec![role]);
    Ok(())
}

#[then("no worker was spawned")]
fn then_no_worker(world: &mut LaunchWorld) {
    assert!(
        world.spawner.spawned().is_empty(),
        "unexpected spawns: {:?}",
        world.spawner.spawned()
    );
}

#[then("every worker was stopped")]
fn then_workers_stopped(world: &mut LaunchWorld) {
    assert_eq!(world.spawner.live_children(), 0);
}

#[then("no data-store handle was created")]
fn then_no_store_handle(world: &mut LaunchWorld) {
    assert_eq!(world.connector.connects(), 0);
    assert_eq!(world.connector.probes(), 0);
}

#[then("the data store was not probed")]
fn then_store_not_probed(world: &mut LaunchWorld) {
    assert_eq!(world.connector.probes(), 0);
}

#[then("the master passed through every boot state in order")]
fn then_boot_states(world: &mut LaunchWorld) {
    assert_eq!(
        world.reporter.states(),
        vec![
            MasterState::Booting,
            MasterState::ConfigValidated,
            MasterState::StoreConnected,
            MasterState::RestrictionResolved,
            MasterState::GateSatisfied,
            MasterState::RolesSpawned,
            MasterState::Steady,
            MasterState::Stopping,
        ]
    );
}

#[then("the master stopped without reaching steady state")]
fn then_stopped_before_steady(world: &mut LaunchWorld) {
    assert_eq!(
        world.reporter.states(),
        vec![
            MasterState::Booting,
            MasterState::ConfigValidated,
            MasterState::StoreConnected,
            MasterState::RestrictionResolved,
            MasterState::GateSatisfied,
            MasterState::Stopping,
        ]
    );
}

#[then("the developer donation advisory was raised {count} time(s)")]
fn then_advisories(world: &mut LaunchWorld, count: usize) {
    assert_eq!(world.reporter.advisories().len(), count);
}

#[then("the runtime artefacts are removed")]
fn then_runtime_removed(world: &mut LaunchWorld) {
    for name in ["poold.lock", "poold.pid", "poold.health"] {
        let path = world.runtime_file(name);
        assert!(!path.exists(), "{} should be removed", path.display());
    }
}

#[then("the health snapshot reports {status} with {workers} workers")]
fn then_health_snapshot(
    world: &mut LaunchWorld,
    status: QuotedString,
    workers: u64,
) -> StepResult {
    let snapshot = world.wait_for_health(status.as_str())?;
    assert_eq!(snapshot["workers"].as_u64(), Some(workers));
    let pid = fs::read_to_string(world.runtime_file("poold.pid"))
        .map_err(|error| error.to_string())?;
    assert_eq!(pid.trim(), std::process::id().to_string());
    Ok(())
}

#[then("the entry point was entered once for {token}")]
fn then_entered_once(world: &mut LaunchWorld, token: QuotedString) -> StepResult {
    let role = token
        .as_str()
        .parse::<Role>()
        .map_err(|error| error.to_string())?;
    let calls = world.entry.calls();
    assert_eq!(calls.len(), 1, "entry calls: {calls:?}");
    assert!(calls.iter().all(|call| call.role == role));
    Ok(())
}

#[then("the entry point received fork id {fork_id}")]
fn then_entry_fork(world: &mut LaunchWorld, fork_id: usize) {
    let calls = world.entry.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls.iter().all(|call| call.fork_id == Some(fork_id)));
}

#[then("the entry point received child pool {pool}")]
fn then_entry_child_pool(world: &mut LaunchWorld, pool: QuotedString) {
    let calls = world.entry.calls();
    assert_eq!(calls.len(), 1);
    assert!(
        calls
            .iter()
            .all(|call| call.child_pool.as_deref() == Some(pool.as_str()))
    );
}

#[then("the entry point was never entered")]
fn then_entry_never(world: &mut LaunchWorld) {
    assert!(world.entry.calls().is_empty());
}

#[scenario(path = "tests/features/master_boot.feature")]
fn master_boot_behaviour(world: LaunchWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/worker_dispatch.feature")]
fn worker_dispatch_behaviour(world: LaunchWorld) {
    let _ = world;
}

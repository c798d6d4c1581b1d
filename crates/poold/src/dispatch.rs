//! Worker-side role dispatch.
//!
//! A process launched by the master carries its role in
//! [`ROLE_ENV_VAR`](crate::topology::ROLE_ENV_VAR). The dispatcher classifies
//! the token and hands control to exactly one [`RoleEntryPoint`] call. An
//! unrecognised token is fatal.

use std::env;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::Command;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use pool_config::Config;

use crate::bootstrap::BootContext;
use crate::process::ShutdownSignal;
use crate::role::{Role, RoleToken};
use crate::store::StoreHandle;
use crate::topology::{CHILD_POOL_ENV_VAR, FORK_ID_ENV_VAR, ROLE_ENV_VAR};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
const IDLE_POLL: Duration = Duration::from_millis(200);

/// Whether the current process is the master or a spawned worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessKind {
    /// The supervisor itself.
    Master,
    /// A worker bound to a role by the master.
    Worker(WorkerBinding),
}

impl ProcessKind {
    /// Inspects the process environment.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Classifies the process using `lookup` to read bindings.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(token) = lookup(ROLE_ENV_VAR) else {
            return Self::Master;
        };
        Self::Worker(WorkerBinding {
            token: RoleToken::parse(&token),
            fork_id: lookup(FORK_ID_ENV_VAR).and_then(|value| value.parse().ok()),
            child_pool: lookup(CHILD_POOL_ENV_VAR),
        })
    }
}

/// Role binding read by a worker at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerBinding {
    /// Role token, possibly unrecognised.
    pub token: RoleToken,
    /// Work-server fork id.
    pub fork_id: Option<usize>,
    /// Child pool watched by a child daemon watcher.
    pub child_pool: Option<String>,
}

impl WorkerBinding {
    /// Binding for a known role without instance metadata.
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        Self {
            token: RoleToken::Known(role),
            fork_id: None,
            child_pool: None,
        }
    }
}

/// Everything a role entry point receives.
#[derive(Debug, Clone, Copy)]
pub struct WorkerContext<'a> {
    /// Role being entered.
    pub role: Role,
    /// Work-server fork id.
    pub fork_id: Option<usize>,
    /// Child pool id for child watchers.
    pub child_pool: Option<&'a str>,
    /// Configuration loaded by this worker.
    pub config: &'a Config,
    /// The worker's own store handle.
    pub store: &'a StoreHandle,
}

/// Errors raised while dispatching a worker.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The bound token names no role.
    #[error("unknown worker role \"{token}\", valid roles: {valid}")]
    UnknownRole {
        /// Token read from the environment.
        token: String,
        /// Comma-separated list of valid tokens.
        valid: String,
    },
    /// Replacing the process with the role command failed.
    #[error("failed to execute '{program}' for role {role}: {source}")]
    Exec {
        /// Role being entered.
        role: Role,
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// External entry point that runs a role's logic.
pub trait RoleEntryPoint: Send + Sync {
    /// Runs `role`; returns when the role finishes.
    fn enter(&self, role: Role, context: &WorkerContext<'_>) -> Result<(), DispatchError>;
}

/// Transfers control to the entry point for the bound role.
///
/// The entry point is called exactly once for a known role and never for an
/// unknown one.
pub fn dispatch_worker(
    binding: &WorkerBinding,
    context: &BootContext,
    entry: &dyn RoleEntryPoint,
) -> Result<(), DispatchError> {
    let role = match &binding.token {
        RoleToken::Known(role) => *role,
        RoleToken::Unknown(token) => {
            return Err(DispatchError::UnknownRole {
                token: token.clone(),
                valid: Role::valid_tokens(),
            });
        }
    };
    context.reporter().role_entered(role);
    let worker = WorkerContext {
        role,
        fork_id: binding.fork_id,
        child_pool: binding.child_pool.as_deref(),
        config: context.config(),
        store: context.store(),
    };
    entry.enter(role, &worker)
}

/// Production entry point: executes `roles.<token>.command`.
///
/// The worker process image is replaced by the command, which inherits the
/// role binding through the environment. Without a command the worker idles
/// until it receives a termination signal.
pub struct CommandEntryPoint<S> {
    shutdown: S,
}

impl<S> CommandEntryPoint<S>
where
    S: ShutdownSignal,
{
    /// Builds an entry point that idles on `shutdown` when no command exists.
    pub fn new(shutdown: S) -> Self {
        Self { shutdown }
    }
}

impl<S> RoleEntryPoint for CommandEntryPoint<S>
where
    S: ShutdownSignal,
{
    fn enter(&self, role: Role, context: &WorkerContext<'_>) -> Result<(), DispatchError> {
        let command = context
            .config
            .role_command(role.token())
            .and_then(|command| command.command.split_first());
        if let Some((program, args)) = command {
            let source = Command::new(program).args(args).exec();
            return Err(DispatchError::Exec {
                role,
                program: program.clone(),
                source,
            });
        }

        warn!(
            target: DISPATCH_TARGET,
            role = %role,
            key = %format!("roles.{}.command", role.token()),
            "no command configured for role; idling until shutdown"
        );
        while !self.shutdown.triggered() {
            thread::sleep(IDLE_POLL);
        }
        Ok(())
    }
}

//! Resolves which worker processes the master should run.

use std::fmt;

use tracing::error;

use pool_config::Config;

use crate::role::{ModuleRestriction, Role};

use super::TOPOLOGY_TARGET;

/// One worker process to spawn: a role plus its instance metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerSpec {
    role: Role,
    fork_id: Option<usize>,
    child_pool: Option<String>,
}

impl WorkerSpec {
    /// Single-instance worker for `role`.
    #[must_use]
    pub const fn single(role: Role) -> Self {
        Self {
            role,
            fork_id: None,
            child_pool: None,
        }
    }

    /// Work-server instance with a 1-based fork id.
    #[must_use]
    pub const fn work_server(fork_id: usize) -> Self {
        Self {
            role: Role::WorkServer,
            fork_id: Some(fork_id),
            child_pool: None,
        }
    }

    /// Watcher for a merged-mining child pool.
    #[must_use]
    pub fn child_watcher(pool: impl Into<String>) -> Self {
        Self {
            role: Role::ChildDaemonWatcher,
            fork_id: None,
            child_pool: Some(pool.into()),
        }
    }

    /// Role the worker is bound to.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Fork id of a work-server instance.
    #[must_use]
    pub const fn fork_id(&self) -> Option<usize> {
        self.fork_id
    }

    /// Child pool watched by a child daemon watcher.
    #[must_use]
    pub fn child_pool(&self) -> Option<&str> {
        self.child_pool.as_deref()
    }
}

impl fmt::Display for WorkerSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.role.fmt(formatter)?;
        if let Some(fork_id) = self.fork_id {
            write!(formatter, "#{fork_id}")?;
        }
        if let Some(pool) = &self.child_pool {
            write!(formatter, "[{pool}]")?;
        }
        Ok(())
    }
}

/// Ordered set of workers activated at boot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationPlan {
    specs: Vec<WorkerSpec>,
}

impl ActivationPlan {
    /// Resolves the plan from configuration and an optional restriction.
    ///
    /// A restriction activates only its mapped roles and ignores the enable
    /// flags. `pool` also brings up the daemon watchers when
    /// `pool_server.bundle_daemon_watchers` is set. Without a restriction
    /// every enabled role is activated.
    #[must_use]
    pub fn resolve(config: &Config, restriction: Option<ModuleRestriction>) -> Self {
        let roles: Vec<Role> = match restriction {
            Some(restriction) => {
                let mut roles = restriction.roles().to_vec();
                if restriction == ModuleRestriction::Pool
                    && config.pool_server.bundle_daemon_watchers
                {
                    roles.extend([Role::DaemonWatcher, Role::ChildDaemonWatcher]);
                }
                roles
            }
            None => Role::ALL
                .into_iter()
                .filter(|role| role_enabled(config, *role))
                .collect(),
        };

        let specs = roles
            .into_iter()
            .flat_map(|role| instances(config, role))
            .collect();
        Self { specs }
    }

    /// Builds a plan from explicit specs.
    #[must_use]
    pub fn from_specs(specs: Vec<WorkerSpec>) -> Self {
        Self { specs }
    }

    /// Workers in spawn order.
    #[must_use]
    pub fn specs(&self) -> &[WorkerSpec] {
        &self.specs
    }

    /// Number of instances planned for `role`.
    #[must_use]
    pub fn count(&self, role: Role) -> usize {
        self.specs.iter().filter(|spec| spec.role == role).count()
    }

    /// Distinct roles in the plan, in spawn order.
    #[must_use]
    pub fn roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.specs.iter().map(WorkerSpec::role).collect();
        roles.dedup();
        roles
    }

    /// Total number of planned workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true when nothing would be spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn role_enabled(config: &Config, role: Role) -> bool {
    match role {
        Role::WorkServer => config.pool_server.enabled,
        Role::DaemonWatcher => config.daemon.enabled,
        Role::ChildDaemonWatcher => config.merged_mining.enabled,
        Role::RewardUnlocker => config.block_unlocker.enabled,
        Role::PayoutProcessor => config.payments.enabled,
        Role::ApiServer => config.api.enabled,
        Role::StatsCollector => config.charts.enabled,
        Role::NotificationBot => config.telegram.enabled,
    }
}

fn instances(config: &Config, role: Role) -> Vec<WorkerSpec> {
    match role {
        Role::WorkServer => {
            if config.pool_server.ports.is_empty() {
                error!(
                    target: TOPOLOGY_TARGET,
                    role = %role,
                    "no stratum ports configured; work servers not started"
                );
                return Vec::new();
            }
            let forks = config.pool_server.cluster_forks.resolve();
            (1..=forks).map(WorkerSpec::work_server).collect()
        }
        Role::ChildDaemonWatcher => {
            if !config.merged_mining.enabled {
                return Vec::new();
            }
            config
                .merged_mining
                .child_pools
                .iter()
                .map(WorkerSpec::child_watcher)
                .collect()
        }
        other => vec![WorkerSpec::single(other)],
    }
}

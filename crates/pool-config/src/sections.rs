//! Nested configuration sections.

use std::fmt;
use std::num::NonZeroUsize;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_DEV_DONATION, DEFAULT_GATE_TIMEOUT_MS, DEFAULT_MINIMUM_STORE_VERSION,
    DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT, DEFAULT_RESTART_DELAY_MS,
    DEFAULT_SHUTDOWN_TIMEOUT_MS, DEFAULT_SPAWN_INTERVAL_MS,
};

/// Work-server section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolServerConfig {
    /// Whether work-server processes run when no module restriction applies.
    pub enabled: bool,
    /// Operator wallet address that receives block rewards.
    pub pool_address: String,
    /// Number of work-server processes to fork.
    pub cluster_forks: ClusterForks,
    /// Stratum ports served by each work-server process.
    pub ports: Vec<u16>,
    /// Whether `-module=pool` also starts the daemon watchers.
    pub bundle_daemon_watchers: bool,
}

impl Default for PoolServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pool_address: String::new(),
            cluster_forks: ClusterForks::Auto,
            ports: Vec::new(),
            bundle_daemon_watchers: false,
        }
    }
}

/// Work-server fork count: `"auto"` (one per CPU) or an explicit number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(try_from = "RawForks", into = "RawForks")]
pub enum ClusterForks {
    /// One fork per available CPU.
    #[default]
    Auto,
    /// A fixed number of forks.
    Count(NonZeroUsize),
}

impl ClusterForks {
    /// Resolves the setting to a concrete process count.
    #[must_use]
    pub fn resolve(self) -> usize {
        match self {
            Self::Auto => thread::available_parallelism().map_or(1, NonZeroUsize::get),
            Self::Count(count) => count.get(),
        }
    }
}

impl fmt::Display for ClusterForks {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => formatter.write_str("auto"),
            Self::Count(count) => write!(formatter, "{count}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
enum RawForks {
    Count(usize),
    Keyword(String),
}

impl TryFrom<RawForks> for ClusterForks {
    type Error = String;

    fn try_from(raw: RawForks) -> Result<Self, Self::Error> {
        match raw {
            // A zero count falls back to a single fork.
            RawForks::Count(count) => Ok(Self::Count(
                NonZeroUsize::new(count).unwrap_or(NonZeroUsize::MIN),
            )),
            RawForks::Keyword(keyword) if keyword.eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            RawForks::Keyword(keyword) => keyword
                .trim()
                .parse::<usize>()
                .map(|count| Self::Count(NonZeroUsize::new(count).unwrap_or(NonZeroUsize::MIN)))
                .map_err(|_| format!("cluster_forks must be \"auto\" or a number, got '{keyword}'")),
        }
    }
}

impl From<ClusterForks> for RawForks {
    fn from(forks: ClusterForks) -> Self {
        match forks {
            ClusterForks::Auto => Self::Keyword("auto".to_owned()),
            ClusterForks::Count(count) => Self::Count(count.get()),
        }
    }
}

/// Merged-mining section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MergedMiningConfig {
    /// Whether child pools are mined alongside the parent chain.
    pub enabled: bool,
    /// Identifiers of the child pools, one watcher each.
    pub child_pools: Vec<String>,
}

/// Enable flag shared by the single-instance roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RoleToggle {
    /// Whether the role runs when no module restriction applies.
    pub enabled: bool,
}

impl RoleToggle {
    /// Toggle with the role switched on.
    #[must_use]
    pub const fn enabled() -> Self {
        Self { enabled: true }
    }

    /// Toggle with the role switched off.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { enabled: false }
    }
}

impl Default for RoleToggle {
    fn default() -> Self {
        Self::enabled()
    }
}

/// Fee settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Developer donation, in percent of each block reward.
    pub dev_donation: f64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            dev_donation: DEFAULT_DEV_DONATION,
        }
    }
}

/// Data-store connection section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Store host name or address.
    pub host: String,
    /// Store TCP port.
    pub port: u16,
    /// Database index; only positive values replace the default of 0.
    pub db: i64,
    /// Optional password sent during the handshake.
    pub auth: Option<String>,
    /// Oldest acceptable server version, as `major.minor[.patch]`.
    pub minimum_version: String,
    /// Upper bound on the compatibility check, in milliseconds.
    pub gate_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_REDIS_HOST.to_owned(),
            port: DEFAULT_REDIS_PORT,
            db: 0,
            auth: None,
            minimum_version: DEFAULT_MINIMUM_STORE_VERSION.to_owned(),
            gate_timeout_ms: DEFAULT_GATE_TIMEOUT_MS,
        }
    }
}

/// Worker supervision section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Delay before replacing a worker that exited.
    pub restart_delay_ms: u64,
    /// Pause between consecutive work-server forks.
    pub spawn_interval_ms: u64,
    /// Grace period for workers after a termination signal.
    pub shutdown_timeout_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
            spawn_interval_ms: DEFAULT_SPAWN_INTERVAL_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

/// External program implementing a role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RoleCommand {
    /// Program followed by its arguments.
    pub command: Vec<String>,
}

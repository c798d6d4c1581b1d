//! Shared configuration for the pool supervisor and its worker roles.
//!
//! Every process in the topology, the master as well as each spawned worker,
//! loads the same [`Config`] independently. Values are layered by
//! [`ortho_config`]: built-in defaults, then a TOML file (selected with
//! `--config-path`, `POOL_CONFIG_PATH`, or a `.pool.toml` dotfile), then
//! `POOL_*` environment variables. Nested sections are only configurable from
//! files and the environment; the command line of the supervisor is reserved
//! for its single-dash `-module=` and `-config=` switches.

mod defaults;
mod logging;
mod runtime;
mod sections;

use std::ffi::OsString;
use std::path::Path;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoResult};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_DEV_DONATION, DEFAULT_GATE_TIMEOUT_MS, DEFAULT_LOG_FILTER,
    DEFAULT_MINIMUM_STORE_VERSION, DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT,
    DEFAULT_RESTART_DELAY_MS, DEFAULT_SHUTDOWN_TIMEOUT_MS, DEFAULT_SPAWN_INTERVAL_MS,
    default_log_filter, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{RuntimePaths, RuntimePathsError};
pub use sections::{
    ClusterForks, FeeConfig, MergedMiningConfig, PoolServerConfig, RedisConfig, RoleCommand,
    RoleToggle, SupervisorConfig,
};

/// Fully resolved configuration shared by the master and every worker.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "POOL")]
#[serde(default)]
pub struct Config {
    /// Tracing filter expression applied to every process.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Directory for the master's lock, pid, and health files.
    #[ortho_config(skip_cli)]
    pub runtime_dir: Option<Utf8PathBuf>,
    /// Work-server settings, including the operator's payout address.
    #[ortho_config(skip_cli)]
    pub pool_server: PoolServerConfig,
    /// Merged-mining child pools, each watched by its own daemon watcher.
    #[ortho_config(skip_cli)]
    pub merged_mining: MergedMiningConfig,
    /// Blockchain daemon watcher toggle.
    #[ortho_config(skip_cli)]
    pub daemon: RoleToggle,
    /// Reward unlocker toggle.
    #[ortho_config(skip_cli)]
    pub block_unlocker: RoleToggle,
    /// Payout processor toggle.
    #[ortho_config(skip_cli)]
    pub payments: RoleToggle,
    /// HTTP API toggle.
    #[ortho_config(skip_cli)]
    pub api: RoleToggle,
    /// Statistics collector toggle.
    #[ortho_config(skip_cli)]
    pub charts: RoleToggle,
    /// Notification bot toggle.
    #[ortho_config(skip_cli)]
    pub telegram: RoleToggle,
    /// Fee settings surfaced as boot advisories.
    #[ortho_config(skip_cli)]
    pub fees: FeeConfig,
    /// Shared data-store connection parameters.
    #[ortho_config(skip_cli)]
    pub redis: RedisConfig,
    /// Worker supervision timings.
    #[ortho_config(skip_cli)]
    pub supervisor: SupervisorConfig,
    /// Per-role entry point commands keyed by role token.
    #[ortho_config(skip_cli)]
    pub roles: std::collections::BTreeMap<String, RoleCommand>,
}

impl Config {
    /// Loads configuration, optionally reading an explicit file first.
    ///
    /// Without a path the usual discovery rules apply (`POOL_CONFIG_PATH`,
    /// then `.pool.toml` in the working and home directories).
    pub fn load_with_path(path: Option<&Path>) -> OrthoResult<Self> {
        let mut args = vec![OsString::from(env!("CARGO_PKG_NAME"))];
        if let Some(path) = path {
            args.push(OsString::from("--config-path"));
            args.push(path.as_os_str().to_owned());
        }
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the configured log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Looks up the entry point command configured for a role token.
    #[must_use]
    pub fn role_command(&self, token: &str) -> Option<&RoleCommand> {
        self.roles.get(token)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            runtime_dir: None,
            pool_server: PoolServerConfig::default(),
            merged_mining: MergedMiningConfig::default(),
            daemon: RoleToggle::enabled(),
            block_unlocker: RoleToggle::enabled(),
            payments: RoleToggle::enabled(),
            api: RoleToggle::enabled(),
            charts: RoleToggle::enabled(),
            telegram: RoleToggle::disabled(),
            fees: FeeConfig::default(),
            redis: RedisConfig::default(),
            supervisor: SupervisorConfig::default(),
            roles: std::collections::BTreeMap::new(),
        }
    }
}

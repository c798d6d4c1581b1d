use std::env;

use camino::Utf8PathBuf;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

/// Default log filter expression used by every process.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default data-store host.
pub const DEFAULT_REDIS_HOST: &str = "127.0.0.1";

/// Default data-store port.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Oldest data-store server version the pool can operate against.
pub const DEFAULT_MINIMUM_STORE_VERSION: &str = "2.6";

/// Upper bound on the compatibility check before boot is abandoned.
pub const DEFAULT_GATE_TIMEOUT_MS: u64 = 10_000;

/// Delay before a crashed worker is replaced.
pub const DEFAULT_RESTART_DELAY_MS: u64 = 2_000;

/// Pause between consecutive work-server forks.
pub const DEFAULT_SPAWN_INTERVAL_MS: u64 = 10;

/// Grace period for workers to exit after a termination signal.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 10_000;

/// Recommended developer donation, in percent.
pub const DEFAULT_DEV_DONATION: f64 = 0.2;

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Computes the runtime directory used when none is configured.
pub(crate) fn default_runtime_directory() -> Utf8PathBuf {
    default_runtime_directory_inner()
}

#[cfg(unix)]
fn default_runtime_directory_inner() -> Utf8PathBuf {
    if let Some(mut dir) = runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok()) {
        dir.push("pool");
        return dir;
    }
    let mut dir = fallback_base_directory();
    dir.push("pool");
    dir.push(user_namespace());
    dir
}

#[cfg(unix)]
fn user_namespace() -> String {
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn default_runtime_directory_inner() -> Utf8PathBuf {
    let mut dir = fallback_base_directory();
    dir.push("pool");
    dir
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

//! Derives the master's runtime artefact paths.
//!
//! The runtime directory houses the supervisor lock, pid, and health
//! snapshot. Operators and scripts read the health file to learn whether the
//! topology is up and how many workers it is running.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;
use crate::defaults::default_runtime_directory;

/// Canonical paths for runtime artefacts written by the supervisor.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    runtime_dir: PathBuf,
    lock_path: PathBuf,
    pid_path: PathBuf,
    health_path: PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the shared configuration, creating the
    /// directory when it is missing.
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        let runtime_dir = match &config.runtime_dir {
            Some(dir) if dir.as_str().is_empty() => return Err(RuntimePathsError::EmptyDirectory),
            Some(dir) => dir.as_std_path().to_path_buf(),
            None => default_runtime_directory().into_std_path_buf(),
        };
        fs::create_dir_all(&runtime_dir).map_err(|source| RuntimePathsError::RuntimeDirectory {
            path: runtime_dir.clone(),
            source,
        })?;
        Ok(Self {
            lock_path: runtime_dir.join("poold.lock"),
            pid_path: runtime_dir.join("poold.pid"),
            health_path: runtime_dir.join("poold.health"),
            runtime_dir,
        })
    }

    /// Directory holding runtime artefacts.
    pub fn runtime_dir(&self) -> &Path {
        self.runtime_dir.as_path()
    }

    /// Path to the lock file guarding singleton startup.
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// Path to the PID file.
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }

    /// Path to the health snapshot.
    pub fn health_path(&self) -> &Path {
        self.health_path.as_path()
    }
}

/// Errors raised while deriving supervisor runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// The configured runtime directory was an empty string.
    #[error("runtime_dir must not be empty")]
    EmptyDirectory,
    /// Creating the runtime directory failed.
    #[error("failed to prepare runtime directory '{path}': {source}")]
    RuntimeDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

//! Configuration loader backed by a temporary runtime directory.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::OrthoError;
use tempfile::TempDir;

use pool_config::{ClusterForks, Config};

use crate::bootstrap::ConfigLoader;

pub const TEST_POOL_ADDRESS: &str = "4AdUndXHHZ6cfufTMvppY6JwXNouMBzSkbLYfpAV5Usx";

/// Loader returning a fully enabled topology with zero supervision delays.
#[derive(Clone)]
pub struct TestConfigLoader {
    config: Config,
    dir: Arc<TempDir>,
}

impl TestConfigLoader {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp runtime dir");
        let mut config = Config {
            runtime_dir: Some(
                Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
                    .expect("temp path is utf-8"),
            ),
            ..Config::default()
        };
        config.pool_server.pool_address = TEST_POOL_ADDRESS.to_owned();
        config.pool_server.ports = vec![3333];
        config.pool_server.cluster_forks = ClusterForks::Count(NonZeroUsize::MIN);
        config.merged_mining.enabled = true;
        config.merged_mining.child_pools = vec!["tari".to_owned()];
        config.telegram.enabled = true;
        config.redis.host = "127.0.0.1".to_owned();
        config.redis.gate_timeout_ms = 200;
        config.supervisor.restart_delay_ms = 0;
        config.supervisor.spawn_interval_ms = 0;
        config.supervisor.shutdown_timeout_ms = 100;
        Self {
            config,
            dir: Arc::new(dir),
        }
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn runtime_dir(&self) -> &Path {
        self.dir.path()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

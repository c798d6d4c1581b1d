//! Boot sequence shared by the master and every worker.

use std::path::PathBuf;
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use pool_config::Config;

use crate::health::{HealthReporter, MasterState};
use crate::store::{StoreConnector, StoreError, StoreHandle, StoreParams};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::validate::{AddressError, validate_pool_address};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the shared configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that layers defaults, file, and environment.
#[derive(Debug, Default, Clone)]
pub struct SystemConfigLoader {
    path: Option<PathBuf>,
}

impl SystemConfigLoader {
    /// Builds a loader reading `path` when given, else the discovered file.
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_with_path(self.path.as_deref())
    }
}

/// Loader that returns a pre-built configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an existing configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The operator address was rejected.
    #[error(transparent)]
    Address(#[from] AddressError),
    /// The store handle could not be built.
    #[error("failed to create data-store handle: {source}")]
    Store {
        /// Underlying store error.
        #[source]
        source: StoreError,
    },
}

/// Context object carried into every component after boot.
pub struct BootContext {
    config: Config,
    store: StoreHandle,
    reporter: Arc<dyn HealthReporter>,
    telemetry: TelemetryHandle,
}

impl BootContext {
    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// This process's store handle.
    #[must_use]
    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Reporter receiving lifecycle events.
    #[must_use]
    pub fn reporter(&self) -> &Arc<dyn HealthReporter> {
        &self.reporter
    }

    /// Telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Loads configuration, validates the operator address, and creates the
/// store handle.
///
/// The address is checked before the connector is called.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    connector: &dyn StoreConnector,
) -> Result<BootContext, BootError> {
    reporter.state_changed(MasterState::Booting);
    let config = loader
        .load()
        .map_err(|source| BootError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootError::Telemetry { source })?;
    tracing::info!(
        target: concat!(env!("CARGO_PKG_NAME"), "::master"),
        version = env!("CARGO_PKG_VERSION"),
        "starting pool supervisor"
    );

    validate_pool_address(&config.pool_server.pool_address)?;
    reporter.state_changed(MasterState::ConfigValidated);

    let store = connector
        .connect(&StoreParams::from_config(&config))
        .map_err(|source| BootError::Store { source })?;
    reporter.state_changed(MasterState::StoreConnected);

    Ok(BootContext {
        config,
        store,
        reporter,
        telemetry,
    })
}

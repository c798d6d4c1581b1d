//! Shared data-store handle and the version probe used by the gate.
//!
//! Building a [`StoreHandle`] never touches the network; the first round trip
//! happens when the compatibility gate runs a [`StoreProbe`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use redis::{Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use thiserror::Error;

use pool_config::Config;

/// Errors raised by the data-store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The client could not be constructed from the parameters.
    #[error("failed to create data-store client for {host}:{port}: {source}")]
    Open {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying client error.
        #[source]
        source: redis::RedisError,
    },
    /// The store could not be reached.
    #[error("data store at {host}:{port} is unreachable: {source}")]
    Connect {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying client error.
        #[source]
        source: redis::RedisError,
    },
    /// The version query failed after connecting.
    #[error("data-store version query failed: {source}")]
    Query {
        /// Underlying client error.
        #[source]
        source: redis::RedisError,
    },
    /// The server reply carried no version field.
    #[error("data-store server info did not report a version")]
    MissingVersion,
    /// A version string could not be parsed.
    #[error("invalid data-store version '{value}'")]
    InvalidVersion {
        /// The text that failed to parse.
        value: String,
    },
}

/// Data-store server version as `major.minor.patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl StoreVersion {
    /// Builds a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    fn components(self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialOrd for StoreVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StoreVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components().cmp(&other.components())
    }
}

impl fmt::Display for StoreVersion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for StoreVersion {
    type Err = StoreError;

    /// Parses `major[.minor[.patch]]`; missing components default to zero.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::InvalidVersion {
            value: value.to_owned(),
        };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }
        let mut parts = trimmed.split('.');
        let mut next = || -> Result<u32, StoreError> {
            parts
                .next()
                .map_or(Ok(0), |part| part.parse::<u32>().map_err(|_| invalid()))
        };
        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

/// Extracts `redis_version` from an `INFO server` reply.
pub fn parse_server_version(info: &str) -> Result<StoreVersion, StoreError> {
    info.lines()
        .find_map(|line| line.trim().strip_prefix("redis_version:"))
        .ok_or(StoreError::MissingVersion)?
        .parse()
}

/// Connection parameters resolved from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreParams {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database index; zero unless a positive index was configured.
    pub db: i64,
    /// Optional password.
    pub auth: Option<String>,
    /// Bound on connection and read waits during probes.
    pub io_timeout: Duration,
}

impl StoreParams {
    /// Resolves parameters from the `redis` configuration section.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let redis = &config.redis;
        Self {
            host: redis.host.clone(),
            port: redis.port,
            db: redis.db.max(0),
            auth: redis.auth.clone().filter(|auth| !auth.is_empty()),
            io_timeout: Duration::from_millis(redis.gate_timeout_ms),
        }
    }

    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                password: self.auth.clone(),
                ..RedisConnectionInfo::default()
            },
        }
    }
}

/// Per-process data-store handle.
///
/// Each process builds its own; handles are never inherited by workers.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    client: Client,
    params: StoreParams,
}

impl StoreHandle {
    /// Opens a client for the parameters without connecting.
    pub fn open(params: StoreParams) -> Result<Self, StoreError> {
        let client = Client::open(params.connection_info()).map_err(|source| StoreError::Open {
            host: params.host.clone(),
            port: params.port,
            source,
        })?;
        Ok(Self { client, params })
    }

    /// Underlying client for role code that issues commands.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Parameters the handle was built from.
    #[must_use]
    pub fn params(&self) -> &StoreParams {
        &self.params
    }
}

/// Reports the server version of the data store.
pub trait StoreProbe: Send {
    /// Queries the server version.
    fn server_version(&self) -> Result<StoreVersion, StoreError>;
}

impl<T> StoreProbe for Box<T>
where
    T: StoreProbe + ?Sized,
{
    fn server_version(&self) -> Result<StoreVersion, StoreError> {
        (**self).server_version()
    }
}

/// Builds store handles and probes for the boot sequence.
pub trait StoreConnector: Send + Sync {
    /// Creates the process's store handle.
    fn connect(&self, params: &StoreParams) -> Result<StoreHandle, StoreError>;

    /// Returns a probe bound to the handle's server.
    fn probe(&self, handle: &StoreHandle) -> Box<dyn StoreProbe>;
}

/// Production connector backed by the `redis` client.
#[derive(Debug, Default, Clone, Copy)]
pub struct RedisConnector;

impl StoreConnector for RedisConnector {
    fn connect(&self, params: &StoreParams) -> Result<StoreHandle, StoreError> {
        StoreHandle::open(params.clone())
    }

    fn probe(&self, handle: &StoreHandle) -> Box<dyn StoreProbe> {
        Box::new(RedisProbe::new(handle))
    }
}

/// Probe that issues `INFO server` over a fresh connection.
#[derive(Debug, Clone)]
pub struct RedisProbe {
    client: Client,
    host: String,
    port: u16,
    timeout: Duration,
}

impl RedisProbe {
    /// Builds a probe sharing the handle's client configuration.
    #[must_use]
    pub fn new(handle: &StoreHandle) -> Self {
        Self {
            client: handle.client.clone(),
            host: handle.params.host.clone(),
            port: handle.params.port,
            timeout: handle.params.io_timeout,
        }
    }
}

impl StoreProbe for RedisProbe {
    fn server_version(&self) -> Result<StoreVersion, StoreError> {
        let connect_error = |source| StoreError::Connect {
            host: self.host.clone(),
            port: self.port,
            source,
        };
        let mut connection = self
            .client
            .get_connection_with_timeout(self.timeout)
            .map_err(connect_error)?;
        connection
            .set_read_timeout(Some(self.timeout))
            .map_err(connect_error)?;
        let info: String = redis::cmd("INFO")
            .arg("server")
            .query(&mut connection)
            .map_err(|source| StoreError::Query { source })?;
        parse_server_version(&info)
    }
}

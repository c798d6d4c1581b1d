//! Test doubles shared by the supervisor behaviour suites.

mod config_loader;
mod entry;
mod reporter;
mod shutdown;
mod spawner;
mod store;
mod world;

pub use config_loader::TestConfigLoader;
pub use entry::RecordingEntryPoint;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use shutdown::TestShutdownSignal;
pub use spawner::RecordingSpawner;
pub use store::{ProbeBehaviour, RecordingConnector};
pub use world::{LaunchWorld, StepResult};

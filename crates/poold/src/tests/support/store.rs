//! Store connector double with scripted probe answers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::store::{StoreConnector, StoreError, StoreHandle, StoreParams, StoreProbe, StoreVersion};

/// How probes built by the connector answer.
#[derive(Debug, Clone, Copy)]
pub enum ProbeBehaviour {
    Answer(StoreVersion),
    Unreachable,
    Silent,
}

/// Counts connections and probes; handles are built offline.
#[derive(Debug, Clone)]
pub struct RecordingConnector {
    behaviour: ProbeBehaviour,
    connects: Arc<AtomicUsize>,
    probes: Arc<AtomicUsize>,
}

impl RecordingConnector {
    pub fn new(behaviour: ProbeBehaviour) -> Self {
        Self {
            behaviour,
            connects: Arc::default(),
            probes: Arc::default(),
        }
    }

    pub fn set_behaviour(&mut self, behaviour: ProbeBehaviour) {
        self.behaviour = behaviour;
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl Default for RecordingConnector {
    fn default() -> Self {
        Self::new(ProbeBehaviour::Answer(StoreVersion::new(7, 2, 4)))
    }
}

impl StoreConnector for RecordingConnector {
    fn connect(&self, params: &StoreParams) -> Result<StoreHandle, StoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        StoreHandle::open(params.clone())
    }

    fn probe(&self, _handle: &StoreHandle) -> Box<dyn StoreProbe> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Box::new(ScriptedProbe(self.behaviour))
    }
}

struct ScriptedProbe(ProbeBehaviour);

impl StoreProbe for ScriptedProbe {
    fn server_version(&self) -> Result<StoreVersion, StoreError> {
        match self.0 {
            ProbeBehaviour::Answer(version) => Ok(version),
            ProbeBehaviour::Unreachable => Err(StoreError::MissingVersion),
            ProbeBehaviour::Silent => {
                thread::sleep(Duration::from_secs(5));
                Err(StoreError::MissingVersion)
            }
        }
    }
}

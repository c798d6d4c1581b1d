//! Role entry point that records how it was entered.

use std::sync::{Arc, Mutex};

use crate::dispatch::{DispatchError, RoleEntryPoint, WorkerContext};
use crate::role::Role;

/// One call into the entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCall {
    pub role: Role,
    pub fork_id: Option<usize>,
    pub child_pool: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingEntryPoint {
    calls: Arc<Mutex<Vec<EntryCall>>>,
}

impl RecordingEntryPoint {
    pub fn calls(&self) -> Vec<EntryCall> {
        self.calls.lock().expect("entry mutex poisoned").clone()
    }
}

impl RoleEntryPoint for RecordingEntryPoint {
    fn enter(&self, role: Role, context: &WorkerContext<'_>) -> Result<(), DispatchError> {
        self.calls.lock().expect("entry mutex poisoned").push(EntryCall {
            role,
            fork_id: context.fork_id,
            child_pool: context.child_pool.map(str::to_owned),
        });
        Ok(())
    }
}

//! Per-file resolution state.

use dashmap::DashMap;
use serde::Serialize;

/// Lifecycle of one CSS module inside the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleState {
    Pending,
    Transformed,
    Resolving,
    Resolved,
    Emitted,
    Failed,
}

impl ModuleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ModuleState::Emitted | ModuleState::Failed)
    }
}

/// Latest state per module id.
///
/// A re-run for the same id overwrites the previous entry.
#[derive(Debug, Default)]
pub struct StateTable {
    states: DashMap<String, ModuleState>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, id: &str, state: ModuleState) {
        tracing::debug!(id, ?state, "module state");
        self.states.insert(id.to_string(), state);
    }

    pub fn get(&self, id: &str) -> Option<ModuleState> {
        self.states.get(id).map(|entry| *entry)
    }

    /// Drop the entry for `id` (file changed or removed).
    pub fn forget(&self, id: &str) {
        self.states.remove(id);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

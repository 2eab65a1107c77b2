//! Deterministic in-memory inspector
//!
//! Serves a fixed snapshot of remote state. Used by tests and by callers
//! that already fetched backend state out of band and want to validate
//! against it without further network traffic.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{InspectError, RemoteState, RemoteStateInspector};

/// An inspector backed by a fixed map of stack states
///
/// Stacks not present in the snapshot report [`RemoteState::Absent`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotInspector {
    states: HashMap<String, RemoteState>,
}

impl SnapshotInspector {
    /// Creates an empty snapshot; every stack reports as absent
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the state of a stack
    pub fn with_stack(mut self, name: impl Into<String>, state: RemoteState) -> Self {
        self.states.insert(name.into(), state);
        self
    }

    /// Number of stacks in the snapshot
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[async_trait]
impl RemoteStateInspector for SnapshotInspector {
    async fn inspect(&self, stack_name: &str) -> Result<RemoteState, InspectError> {
        Ok(self
            .states
            .get(stack_name)
            .cloned()
            .unwrap_or(RemoteState::Absent))
    }
}

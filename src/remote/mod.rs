//! Remote state inspection
//!
//! The boundary to the deployment backend. The core only ever asks one
//! question per stack: does it exist, what is its lifecycle status, and
//! which exports does it currently publish. Everything behind that question
//! (API clients, credentials, regions) lives outside this crate.

mod retry;
mod snapshot;

pub use retry::{RetryPolicy, RetryingInspector};
pub use snapshot::SnapshotInspector;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::StackStatus;

/// What the deployment backend reports for a single stack
///
/// `Unknown` is distinct from `Absent`: the first means the backend could
/// not be asked (transient failure), the second means it answered and the
/// stack genuinely is not there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteState {
    /// The stack does not exist in the backend
    Absent,

    /// The backend could not be queried; nothing is known about the stack
    Unknown,

    /// The stack exists; a status and its currently published exports
    Present {
        status: StackStatus,
        exports: BTreeMap<String, String>,
    },
}

impl RemoteState {
    /// Builds a `Present` state from a raw backend status string
    pub fn present<I, K, V>(raw_status: &str, exports: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RemoteState::Present {
            status: StackStatus::parse(raw_status),
            exports: exports
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns true if the backend confirmed the stack exists
    pub fn exists(&self) -> bool {
        matches!(self, RemoteState::Present { .. })
    }

    /// The published exports, empty unless the stack is present
    pub fn exports(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            RemoteState::Present { exports, .. } => Some(exports),
            _ => None,
        }
    }
}

/// Why a single inspection call failed
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("inspection timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend throttled the request: {0}")]
    Throttled(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("access denied: {0}")]
    Denied(String),
}

impl InspectError {
    /// Returns true if retrying the call may succeed
    ///
    /// Permission failures are not retryable; everything else is assumed
    /// transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, InspectError::Denied(_))
    }
}

/// Interface to the deployment backend
///
/// Implementations must be cheap to call concurrently; the validator fans
/// out one `inspect` per stack through a bounded worker pool.
#[async_trait]
pub trait RemoteStateInspector: Send + Sync {
    /// Reports the current remote state of the named stack
    async fn inspect(&self, stack_name: &str) -> Result<RemoteState, InspectError>;
}

#[async_trait]
impl<T: RemoteStateInspector + ?Sized> RemoteStateInspector for Arc<T> {
    async fn inspect(&self, stack_name: &str) -> Result<RemoteState, InspectError> {
        (**self).inspect(stack_name).await
    }
}

use thiserror::Error;
use tickshim_core::ShimError;

use crate::{detect::BackendMode, types::TaskId};

/// Errors raised synchronously at a submission call site.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The handle already has a live submission.
    #[error("Task already running: {id}")]
    AlreadyRunning { id: TaskId },

    /// Region/entity placement (or a retirement callback) on a backend without that concept.
    #[error("Unsupported placement: {placement} on the {mode} backend")]
    UnsupportedPlacement {
        placement: &'static str,
        mode: BackendMode,
    },

    /// A required target was absent or malformed. Raised before any host call.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The host refused the submission. Nothing was registered.
    #[error("Host scheduler error: {0}")]
    Host(#[from] HostError),
}

impl From<ShimError> for SchedulerError {
    fn from(err: ShimError) -> Self {
        match err {
            ShimError::InvalidArgument(msg) | ShimError::Config(msg) => {
                SchedulerError::InvalidArgument(msg)
            }
        }
    }
}

/// Failure reported by the host scheduler.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Host rejected the request: {0}")]
    Rejected(String),

    /// Redundant cancellation of a task the host already retired.
    #[error("Host task already retired")]
    AlreadyRetired,

    #[error("Host is shutting down")]
    ShuttingDown,

    /// The token was minted by the other backend.
    #[error("Token does not belong to this host")]
    ForeignToken,
}

/// Why a capability probe did not find its sentinel.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Capability not found: {0}")]
    NotFound(String),

    #[error("Capability probe failed: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

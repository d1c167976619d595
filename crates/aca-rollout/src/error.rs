//! Error types for the rollout core.

use aca_core::RemoteError;
use thiserror::Error;

/// Result type alias for rollout operations.
pub type RolloutResult<T> = Result<T, RolloutError>;

/// Terminal failures of a rollout or deactivation. None are retried.
#[derive(Debug, Error)]
pub enum RolloutError {
    /// The fetched application lacks a field the reconciler needs.
    #[error("remote state of the container app is incomplete: missing {field}")]
    IncompleteRemoteState { field: &'static str },

    /// The revision to deactivate still receives traffic.
    #[error(
        "revision {revision} of container app {app} still receives {weight}% of traffic; \
         route traffic away from it before deactivating"
    )]
    TrafficNotDrained {
        revision: String,
        app: String,
        weight: u32,
    },

    /// The control plane refused the request or ended in a non-success state.
    #[error("control plane rejected the operation: {detail}")]
    RemoteRejected { detail: String },

    /// Deactivation was requested without naming a revision.
    #[error("no revision named for deactivation")]
    NoRevisionToDeactivate,

    #[error("container app {app} not found in resource group {resource_group}")]
    NotFound { resource_group: String, app: String },

    #[error("could not reach the control plane: {0}")]
    Transport(String),
}

impl From<RemoteError> for RolloutError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound { resource_group, app } => {
                RolloutError::NotFound { resource_group, app }
            }
            RemoteError::Transport(msg) | RemoteError::Auth(msg) => RolloutError::Transport(msg),
            other @ (RemoteError::Rejected { .. } | RemoteError::Incomplete(_)) => {
                RolloutError::RemoteRejected {
                    detail: other.to_string(),
                }
            }
        }
    }
}

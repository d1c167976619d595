//! The control-plane seam.
//!
//! `ControlPlane` is the only way the rollout logic talks to the outside
//! world. The ARM client in `aca-client` implements it over HTTPS; tests
//! implement it in memory.

use std::future::Future;

use thiserror::Error;

use crate::types::{ApplicationState, DeploymentEnvelope, SubmitOutcome};

/// Result type alias for control-plane calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors reported by a control-plane implementation.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("container app {app} not found in resource group {resource_group}")]
    NotFound { resource_group: String, app: String },

    #[error("control plane rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("operation did not finish: {0}")]
    Incomplete(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication error: {0}")]
    Auth(String),
}

/// Operations the rollout needs from the container-app control plane.
///
/// Each call runs to a terminal result; implementations do not retry.
pub trait ControlPlane {
    /// Fetch the current description of `app`.
    fn fetch_application_state(
        &self,
        resource_group: &str,
        app: &str,
    ) -> impl Future<Output = RemoteResult<ApplicationState>> + Send;

    /// Create or update `app` from `envelope` and wait for a terminal
    /// provisioning state.
    fn submit_envelope(
        &self,
        resource_group: &str,
        app: &str,
        envelope: &DeploymentEnvelope,
    ) -> impl Future<Output = RemoteResult<SubmitOutcome>> + Send;

    /// Deactivate one revision of `app`.
    fn deactivate_revision(
        &self,
        resource_group: &str,
        app: &str,
        revision: &str,
    ) -> impl Future<Output = RemoteResult<()>> + Send;
}

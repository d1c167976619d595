//! Rollout controller: drives one fetch/reconcile/submit cycle.
//!
//! A `Rollout` runs exactly once per invocation. It either deploys the
//! reconciled envelope or, when the desired rollout asks for it,
//! deactivates a revision behind the drained-traffic guard.

use aca_core::{
    ApplicationState, ControlPlane, DeploymentEnvelope, DesiredRollout, NewRevision,
    ProvisioningState,
};
use tracing::{debug, info, warn};

use crate::deactivate::DeactivationRequest;
use crate::error::{RolloutError, RolloutResult};
use crate::reconciler::reconcile;

/// Current phase of a rollout.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RolloutPhase {
    /// Nothing fetched yet.
    Pending,
    /// Remote state fetched.
    Fetched,
    /// Envelope built, not yet submitted.
    Reconciled,
    /// Envelope submitted and provisioned.
    Completed,
    /// Revision deactivated.
    Deactivated,
    /// Stopped by an error.
    Failed { reason: String },
}

/// What a completed rollout did.
#[derive(Debug, Clone, PartialEq)]
pub enum RolloutOutcome {
    Deployed {
        provisioning_state: ProvisioningState,
        /// Public URL, present for externally reachable apps.
        app_url: Option<String>,
    },
    Deactivated { revision: String },
}

/// A single rollout against one container app.
#[derive(Debug, Clone)]
pub struct Rollout {
    pub resource_group: String,
    pub desired: DesiredRollout,
    pub phase: RolloutPhase,
}

impl Rollout {
    pub fn new(resource_group: &str, desired: DesiredRollout) -> Self {
        Self {
            resource_group: resource_group.to_string(),
            desired,
            phase: RolloutPhase::Pending,
        }
    }

    fn app(&self) -> &str {
        &self.desired.container_app_name
    }

    /// Fetch and reconcile without submitting anything.
    pub async fn plan<C: ControlPlane>(&mut self, client: &C) -> RolloutResult<DeploymentEnvelope> {
        let state = self.fetch(client).await?;
        self.reconcile(&state)
    }

    /// Run the rollout to a terminal outcome.
    pub async fn run<C: ControlPlane>(&mut self, client: &C) -> RolloutResult<RolloutOutcome> {
        let result = self.drive(client).await;
        if let Err(err) = &result {
            self.phase = RolloutPhase::Failed {
                reason: err.to_string(),
            };
            warn!(app = %self.app(), error = %err, "rollout failed");
        }
        result
    }

    async fn drive<C: ControlPlane>(&mut self, client: &C) -> RolloutResult<RolloutOutcome> {
        let state = self.fetch(client).await?;

        if self.desired.deactivate {
            return self.deactivate(client, &state).await;
        }

        let envelope = self.reconcile(&state)?;
        self.submit(client, &envelope).await
    }

    async fn fetch<C: ControlPlane>(&mut self, client: &C) -> RolloutResult<ApplicationState> {
        info!(
            app = %self.app(),
            resource_group = %self.resource_group,
            "fetching current application state"
        );
        let state = client
            .fetch_application_state(&self.resource_group, self.app())
            .await?;
        debug!(app = %self.app(), ?state, "fetched application state");
        self.phase = RolloutPhase::Fetched;
        Ok(state)
    }

    fn reconcile(&mut self, state: &ApplicationState) -> RolloutResult<DeploymentEnvelope> {
        let envelope = reconcile(state, &self.desired)?;
        if let Ok(pretty) = serde_json::to_string_pretty(&envelope) {
            debug!(app = %self.app(), envelope = %pretty, "deployment envelope");
        }
        self.phase = RolloutPhase::Reconciled;
        Ok(envelope)
    }

    async fn submit<C: ControlPlane>(
        &mut self,
        client: &C,
        envelope: &DeploymentEnvelope,
    ) -> RolloutResult<RolloutOutcome> {
        info!(
            app = %self.app(),
            image = %self.desired.image,
            suffix = ?self.desired.revision_suffix,
            "submitting deployment"
        );
        let outcome = client
            .submit_envelope(&self.resource_group, self.app(), envelope)
            .await?;

        if outcome.provisioning_state != ProvisioningState::Succeeded {
            return Err(RolloutError::RemoteRejected {
                detail: format!(
                    "deployment of {} ended in provisioning state {}",
                    self.app(),
                    outcome.provisioning_state
                ),
            });
        }

        let app_url = if envelope.is_external() {
            outcome
                .latest_revision_fqdn
                .as_deref()
                .map(|fqdn| format!("http://{fqdn}/"))
        } else {
            None
        };

        self.phase = RolloutPhase::Completed;
        info!(app = %self.app(), url = ?app_url, "deployment succeeded");
        Ok(RolloutOutcome::Deployed {
            provisioning_state: outcome.provisioning_state,
            app_url,
        })
    }

    async fn deactivate<C: ControlPlane>(
        &mut self,
        client: &C,
        state: &ApplicationState,
    ) -> RolloutResult<RolloutOutcome> {
        let revision = match self.desired.new_revision() {
            NewRevision::Named(name) => name,
            NewRevision::Latest => return Err(RolloutError::NoRevisionToDeactivate),
        };

        let mut request = DeactivationRequest::from_state(self.app(), &revision, state);
        request.execute(client, &self.resource_group).await?;

        self.phase = RolloutPhase::Deactivated;
        Ok(RolloutOutcome::Deactivated { revision })
    }
}

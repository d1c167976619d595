//! Revision deactivation behind a drained-traffic guard.
//!
//! A revision may only be deactivated once the traffic list routes nothing
//! to it. Every entry naming the revision counts, so duplicates add up.
//! Entries following the latest revision count when the target is the
//! latest revision, or when the latest revision is unknown.

use aca_core::{ApplicationState, ControlPlane, TrafficEntry};
use tracing::{info, warn};

use crate::error::{RolloutError, RolloutResult};

/// Progress of a single deactivation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DeactivationPhase {
    /// Traffic list captured, guard not yet checked.
    Fetched,
    /// Guard passed; the revision carries no traffic.
    GuardEvaluated,
    /// The control plane deactivated the revision.
    Deactivated,
    /// Guard failed; the revision still carries traffic.
    Rejected { weight: u32 },
}

/// A request to deactivate one revision, bound to the traffic list it was
/// fetched with.
#[derive(Debug, Clone)]
pub struct DeactivationRequest {
    pub container_app_name: String,
    pub revision_name: String,
    pub current_traffic: Vec<TrafficEntry>,
    /// Revision that `latestRevision` entries currently route to.
    pub latest_revision: Option<String>,
    pub phase: DeactivationPhase,
}

impl DeactivationRequest {
    pub fn new(container_app_name: &str, revision_name: &str, traffic: &[TrafficEntry]) -> Self {
        Self {
            container_app_name: container_app_name.to_string(),
            revision_name: revision_name.to_string(),
            current_traffic: traffic.to_vec(),
            latest_revision: None,
            phase: DeactivationPhase::Fetched,
        }
    }

    pub fn with_latest_revision(mut self, latest_revision: Option<&str>) -> Self {
        self.latest_revision = latest_revision.map(str::to_string);
        self
    }

    /// Capture the traffic list of a fetched application.
    pub fn from_state(
        container_app_name: &str,
        revision_name: &str,
        state: &ApplicationState,
    ) -> Self {
        Self::new(container_app_name, revision_name, state.traffic())
            .with_latest_revision(state.latest_revision_name.as_deref())
    }

    /// Total weight routed to the target revision. Zero if it is not listed.
    pub fn traffic_weight(&self) -> u32 {
        self.current_traffic
            .iter()
            .filter(|e| self.routes_to_target(e))
            .fold(0u32, |acc, e| acc.saturating_add(e.weight))
    }

    fn routes_to_target(&self, entry: &TrafficEntry) -> bool {
        if entry.follows_latest() {
            return match &self.latest_revision {
                Some(latest) => *latest == self.revision_name,
                None => true,
            };
        }
        entry.targets(&self.revision_name)
    }

    /// Check the guard and record the outcome in `phase`.
    pub fn evaluate(&mut self) -> RolloutResult<()> {
        let weight = self.traffic_weight();
        if weight != 0 {
            self.phase = DeactivationPhase::Rejected { weight };
            warn!(
                app = %self.container_app_name,
                revision = %self.revision_name,
                weight,
                "refusing to deactivate revision that still receives traffic"
            );
            return Err(RolloutError::TrafficNotDrained {
                revision: self.revision_name.clone(),
                app: self.container_app_name.clone(),
                weight,
            });
        }

        self.phase = DeactivationPhase::GuardEvaluated;
        Ok(())
    }

    /// Evaluate the guard and, if it holds, deactivate the revision.
    pub async fn execute<C: ControlPlane>(
        &mut self,
        client: &C,
        resource_group: &str,
    ) -> RolloutResult<()> {
        self.evaluate()?;

        info!(
            app = %self.container_app_name,
            revision = %self.revision_name,
            "deactivating revision"
        );
        client
            .deactivate_revision(resource_group, &self.container_app_name, &self.revision_name)
            .await?;

        self.phase = DeactivationPhase::Deactivated;
        info!(revision = %self.revision_name, "revision deactivated");
        Ok(())
    }
}

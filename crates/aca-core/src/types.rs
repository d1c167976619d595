//! Domain types shared across aca-deploy crates.
//!
//! Remote snapshots (`ApplicationState`) keep every field the control plane
//! may leave out as an `Option`; the reconciler decides which of them are
//! required. Outgoing types (`DeploymentEnvelope` and friends) skip `None`
//! fields when serialized, so an absent value never reaches the wire as
//! `null`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Provisioning state reported by the control plane for an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningState {
    Succeeded,
    Failed,
    Canceled,
    InProgress,
    /// Any value this client does not know about, kept verbatim.
    Other(String),
}

impl ProvisioningState {
    pub fn parse(value: &str) -> Self {
        match value {
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Canceled" => Self::Canceled,
            "InProgress" => Self::InProgress,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether the long-running operation behind this state has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
            Self::InProgress => "InProgress",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Remote snapshot ───────────────────────────────────────────────

/// Current description of a container app as fetched from the control plane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationState {
    pub ingress: Option<IngressState>,
    pub scale: Option<ScaleState>,
    pub dapr: Option<Dapr>,
    pub managed_environment_id: Option<String>,
    pub location: Option<String>,
    pub provisioning_state: Option<ProvisioningState>,
    /// Name of the revision that `latestRevision` traffic entries follow.
    pub latest_revision_name: Option<String>,
    pub latest_revision_fqdn: Option<String>,
}

impl ApplicationState {
    /// Traffic entries of the remote ingress, empty when there is no ingress.
    pub fn traffic(&self) -> &[TrafficEntry] {
        self.ingress
            .as_ref()
            .map(|i| i.traffic.as_slice())
            .unwrap_or_default()
    }
}

/// Ingress block of the remote snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngressState {
    pub external: Option<bool>,
    pub target_port: Option<u16>,
    pub traffic: Vec<TrafficEntry>,
    pub custom_domains: Option<Vec<CustomDomain>>,
}

/// Scale block of the remote snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleState {
    pub min_replicas: Option<u32>,
    pub max_replicas: Option<u32>,
}

/// One entry of an ingress traffic-weight list.
///
/// `revision_name` is optional because an entry may instead point at
/// whatever revision is latest (`latest_revision = true`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_name: Option<String>,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub latest_revision: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TrafficEntry {
    /// Entry routing `weight` percent to a named revision.
    pub fn named(revision_name: &str, weight: u32) -> Self {
        Self {
            revision_name: Some(revision_name.to_string()),
            weight,
            latest_revision: false,
            label: None,
        }
    }

    pub fn targets(&self, revision_name: &str) -> bool {
        self.revision_name.as_deref() == Some(revision_name)
    }

    /// Whether the entry follows the latest revision instead of naming one.
    pub fn follows_latest(&self) -> bool {
        self.latest_revision && self.revision_name.is_none()
    }
}

/// Custom domain bound to an ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomDomain {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_type: Option<String>,
}

/// Dapr sidecar configuration.
///
/// Unknown keys from the remote block are kept in `extra` so a remote
/// configuration round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dapr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_protocol: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A scale rule. Only the `custom` and `http` rule kinds are supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScaleRule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomScaleRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpScaleRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomScaleRule {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auth: Vec<ScaleRuleAuth>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpScaleRule {
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auth: Vec<ScaleRuleAuth>,
}

/// Secret handed to a scaler as one of its trigger parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScaleRuleAuth {
    pub secret_ref: String,
    pub trigger_parameter: String,
}

impl ScaleRule {
    /// HTTP concurrency rule applied when no explicit rules are configured.
    pub fn default_http() -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("concurrentRequests".to_string(), "50".to_string());
        Self {
            name: "httpscalingrule".to_string(),
            custom: Some(CustomScaleRule {
                kind: "http".to_string(),
                metadata,
                auth: Vec::new(),
            }),
            http: None,
        }
    }
}

// ── Desired rollout ───────────────────────────────────────────────

/// Validated inputs for one rollout. Built by `DeployParams::desired_rollout`.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredRollout {
    pub container_app_name: String,
    pub container_name: String,
    pub image: String,
    /// Suffix of the new revision. `None` lets the control plane pick one.
    pub revision_suffix: Option<String>,
    pub ingress: IngressOverrides,
    pub scale: ScaleOverrides,
    /// Explicit dapr settings. `None` keeps the remote dapr block.
    pub dapr: Option<DaprOverrides>,
    pub deactivate: bool,
}

impl DesiredRollout {
    /// The revision this rollout creates (or, in deactivation mode, targets).
    pub fn new_revision(&self) -> NewRevision {
        match &self.revision_suffix {
            Some(suffix) => {
                NewRevision::Named(revision_name(&self.container_app_name, suffix))
            }
            None => NewRevision::Latest,
        }
    }
}

/// Full revision name for an app and suffix, as the control plane forms it.
pub fn revision_name(app: &str, suffix: &str) -> String {
    format!("{app}--{suffix}")
}

/// How the revision created by a rollout is addressed in a traffic list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewRevision {
    /// The suffix is known, so the revision name is too.
    Named(String),
    /// The control plane generates the name; address it as "latest".
    Latest,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngressOverrides {
    pub external: Option<bool>,
    pub target_port: Option<u16>,
    pub custom_domains: Option<Vec<CustomDomain>>,
    /// Replaces the remote traffic list as input to the weight computation.
    pub traffic: Option<Vec<TrafficEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleOverrides {
    pub min_replicas: Option<u32>,
    pub max_replicas: Option<u32>,
    /// Non-empty list replaces the default rule wholesale.
    pub rules: Option<Vec<ScaleRule>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaprOverrides {
    pub enabled: Option<bool>,
    pub app_id: Option<String>,
    pub app_port: Option<u16>,
    pub app_protocol: Option<String>,
}

// ── Deployment envelope ───────────────────────────────────────────

/// Desired state submitted to the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentEnvelope {
    pub configuration: Configuration,
    pub location: String,
    pub managed_environment_id: String,
    pub template: Template,
}

impl DeploymentEnvelope {
    /// Whether the envelope exposes the app on a public endpoint.
    pub fn is_external(&self) -> bool {
        self.configuration
            .ingress
            .as_ref()
            .is_some_and(|i| i.external)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub dapr: Dapr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<Ingress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingress {
    pub external: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<Vec<TrafficEntry>>,
    /// Always sent: the control plane treats a missing list differently
    /// from an empty one.
    #[serde(default)]
    pub custom_domains: Vec<CustomDomain>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub containers: Vec<Container>,
    pub scale: Scale,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_suffix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scale {
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub rules: Vec<ScaleRule>,
}

/// Terminal result of submitting an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub provisioning_state: ProvisioningState,
    pub latest_revision_fqdn: Option<String>,
}

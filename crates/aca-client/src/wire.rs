//! ARM JSON shapes for `Microsoft.App/containerApps`.
//!
//! The control plane nests everything but `location` under `properties`.
//! Incoming documents are parsed leniently (every field optional) and
//! converted into `ApplicationState`; the reconciler decides what is
//! required.

use aca_core::{
    ApplicationState, Configuration, CustomDomain, Dapr, DeploymentEnvelope, IngressState,
    ProvisioningState, ScaleState, Template, TrafficEntry,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAppResource {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub properties: Option<ContainerAppProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAppProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub managed_environment_id: Option<String>,
    #[serde(default)]
    pub latest_revision_name: Option<String>,
    #[serde(default)]
    pub latest_revision_fqdn: Option<String>,
    #[serde(default)]
    pub configuration: Option<WireConfiguration>,
    #[serde(default)]
    pub template: Option<WireTemplate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireConfiguration {
    #[serde(default)]
    pub ingress: Option<WireIngress>,
    #[serde(default)]
    pub dapr: Option<Dapr>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireIngress {
    #[serde(default)]
    pub external: Option<bool>,
    #[serde(default)]
    pub target_port: Option<u16>,
    #[serde(default)]
    pub traffic: Option<Vec<TrafficEntry>>,
    #[serde(default)]
    pub custom_domains: Option<Vec<CustomDomain>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTemplate {
    #[serde(default)]
    pub scale: Option<WireScale>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireScale {
    #[serde(default)]
    pub min_replicas: Option<u32>,
    #[serde(default)]
    pub max_replicas: Option<u32>,
}

impl ContainerAppResource {
    pub fn provisioning_state(&self) -> Option<ProvisioningState> {
        self.properties
            .as_ref()?
            .provisioning_state
            .as_deref()
            .map(ProvisioningState::parse)
    }

    pub fn latest_revision_fqdn(&self) -> Option<String> {
        self.properties.as_ref()?.latest_revision_fqdn.clone()
    }
}

impl From<ContainerAppResource> for ApplicationState {
    fn from(resource: ContainerAppResource) -> Self {
        let props = resource.properties.unwrap_or_default();
        let configuration = props.configuration.unwrap_or_default();

        ApplicationState {
            ingress: configuration.ingress.map(|i| IngressState {
                external: i.external,
                target_port: i.target_port,
                traffic: i.traffic.unwrap_or_default(),
                custom_domains: i.custom_domains,
            }),
            scale: props
                .template
                .and_then(|t| t.scale)
                .map(|s| ScaleState {
                    min_replicas: s.min_replicas,
                    max_replicas: s.max_replicas,
                }),
            dapr: configuration.dapr,
            managed_environment_id: props.managed_environment_id,
            location: resource.location,
            provisioning_state: props.provisioning_state.as_deref().map(ProvisioningState::parse),
            latest_revision_name: props.latest_revision_name,
            latest_revision_fqdn: props.latest_revision_fqdn,
        }
    }
}

/// Request body for a create-or-update call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAppPut<'a> {
    pub location: &'a str,
    pub properties: PutProperties<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutProperties<'a> {
    pub managed_environment_id: &'a str,
    pub configuration: &'a Configuration,
    pub template: &'a Template,
}

impl<'a> From<&'a DeploymentEnvelope> for ContainerAppPut<'a> {
    fn from(envelope: &'a DeploymentEnvelope) -> Self {
        Self {
            location: &envelope.location,
            properties: PutProperties {
                managed_environment_id: &envelope.managed_environment_id,
                configuration: &envelope.configuration,
                template: &envelope.template,
            },
        }
    }
}

//! Command-line parameters and how they patch a `DeployParams`.

use aca_core::config::DeployParams;
use aca_core::{CustomDomain, ScaleRule, TrafficEntry};
use clap::Args;
use serde::de::DeserializeOwned;

/// A JSON-encoded list argument. An empty string means "not supplied".
#[derive(Debug, Clone)]
pub struct JsonList<T>(pub Option<Vec<T>>);

pub fn parse_json_list<T: DeserializeOwned>(raw: &str) -> Result<JsonList<T>, String> {
    if raw.trim().is_empty() {
        return Ok(JsonList(None));
    }
    serde_json::from_str(raw)
        .map(|list| JsonList(Some(list)))
        .map_err(|e| format!("invalid JSON list: {e}"))
}

/// Deployment parameters accepted as flags or environment variables.
///
/// Every flag overrides the matching value from `--config`.
#[derive(Debug, Clone, Default, Args)]
pub struct ParamArgs {
    /// Azure subscription id (default: the one of the signed-in account)
    #[arg(long, env = "ACA_SUBSCRIPTION_ID")]
    pub subscription_id: Option<String>,

    /// Resource group of the container app
    #[arg(short = 'g', long, env = "ACA_RESOURCE_GROUP")]
    pub resource_group: Option<String>,

    /// Name of the container app
    #[arg(short, long = "name", env = "ACA_NAME")]
    pub name: Option<String>,

    /// Container image to deploy
    #[arg(short, long, env = "ACA_IMAGE")]
    pub image: Option<String>,

    /// Container name inside the template (default: the app name)
    #[arg(long, env = "ACA_CONTAINER_NAME")]
    pub container_name: Option<String>,

    /// Revision suffix. Without one the control plane generates a name.
    #[arg(long, env = "ACA_REVISION_SUFFIX")]
    pub revision_suffix: Option<String>,

    /// Commit hash; its first 8 characters become the default suffix
    #[arg(long, env = "ACA_COMMIT_HASH")]
    pub commit_hash: Option<String>,

    /// Deactivate the revision named by the suffix instead of deploying
    #[arg(long, env = "ACA_DEACTIVATE")]
    pub deactivate: bool,

    #[arg(long, env = "ACA_DAPR_ENABLED")]
    pub dapr_enabled: Option<bool>,

    #[arg(long, env = "ACA_DAPR_APP_ID")]
    pub dapr_app_id: Option<String>,

    #[arg(long, env = "ACA_DAPR_APP_PORT")]
    pub dapr_app_port: Option<u16>,

    #[arg(long, env = "ACA_DAPR_APP_PROTOCOL")]
    pub dapr_app_protocol: Option<String>,

    /// Expose the app publicly (true/false)
    #[arg(long, env = "ACA_INGRESS_EXTERNAL")]
    pub ingress_external: Option<bool>,

    #[arg(long, env = "ACA_INGRESS_TARGET_PORT")]
    pub ingress_target_port: Option<u16>,

    /// Custom domains as a JSON list
    #[arg(long, env = "ACA_INGRESS_CUSTOM_DOMAINS_JSON", value_parser = parse_json_list::<CustomDomain>)]
    pub ingress_custom_domains_json: Option<JsonList<CustomDomain>>,

    /// Traffic list used instead of the remote one, as JSON
    #[arg(long, env = "ACA_INGRESS_TRAFFIC_JSON", value_parser = parse_json_list::<TrafficEntry>)]
    pub ingress_traffic_json: Option<JsonList<TrafficEntry>>,

    #[arg(long, env = "ACA_SCALE_MIN_REPLICAS")]
    pub scale_min_replicas: Option<u32>,

    #[arg(long, env = "ACA_SCALE_MAX_REPLICAS")]
    pub scale_max_replicas: Option<u32>,

    /// Scale rules as a JSON list; replaces the default HTTP rule
    #[arg(long, env = "ACA_SCALE_RULES_JSON", value_parser = parse_json_list::<ScaleRule>)]
    pub scale_rules_json: Option<JsonList<ScaleRule>>,

    /// Seconds between provisioning-state checks
    #[arg(long, env = "ACA_POLL_INTERVAL_SECS")]
    pub poll_interval_secs: Option<u64>,

    /// Seconds to wait for provisioning before giving up
    #[arg(long, env = "ACA_POLL_TIMEOUT_SECS")]
    pub poll_timeout_secs: Option<u64>,
}

fn list<T>(arg: Option<JsonList<T>>) -> Option<Vec<T>> {
    arg.and_then(|JsonList(list)| list)
}

impl ParamArgs {
    /// Overlay the flags that were given onto `params`.
    pub fn apply(self, mut params: DeployParams) -> DeployParams {
        macro_rules! set {
            ($target:expr, $value:expr) => {
                if let Some(v) = $value {
                    $target = v;
                }
            };
        }
        macro_rules! set_opt {
            ($target:expr, $value:expr) => {
                if let Some(v) = $value {
                    $target = Some(v);
                }
            };
        }

        set_opt!(params.subscription_id, self.subscription_id);
        set!(params.resource_group, self.resource_group);
        set!(params.container_app_name, self.name);
        set!(params.image, self.image);
        set_opt!(params.container_name, self.container_name);
        set_opt!(params.revision_suffix, self.revision_suffix);
        set_opt!(params.commit_hash, self.commit_hash);
        params.deactivate |= self.deactivate;

        set_opt!(params.dapr.enabled, self.dapr_enabled);
        set_opt!(params.dapr.app_id, self.dapr_app_id);
        set_opt!(params.dapr.app_port, self.dapr_app_port);
        set_opt!(params.dapr.app_protocol, self.dapr_app_protocol);

        set_opt!(params.ingress.external, self.ingress_external);
        set_opt!(params.ingress.target_port, self.ingress_target_port);
        set_opt!(params.ingress.custom_domains, list(self.ingress_custom_domains_json));
        set_opt!(params.ingress.traffic, list(self.ingress_traffic_json));

        set_opt!(params.scale.min_replicas, self.scale_min_replicas);
        set_opt!(params.scale.max_replicas, self.scale_max_replicas);
        set_opt!(params.scale.rules, list(self.scale_rules_json));

        set!(params.poll.interval_secs, self.poll_interval_secs);
        set!(params.poll.timeout_secs, self.poll_timeout_secs);

        params
    }
}

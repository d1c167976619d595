//! Deployment parameters: TOML file parsing and validation.
//!
//! `DeployParams` is the raw, user-facing parameter set. It can be loaded
//! from a TOML file and patched by the command line; `desired_rollout`
//! validates it into the `DesiredRollout` the reconciler consumes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{
    CustomDomain, DaprOverrides, DesiredRollout, IngressOverrides, ScaleOverrides, ScaleRule,
    TrafficEntry,
};

/// Number of commit-hash characters used when deriving a revision suffix.
const COMMIT_SUFFIX_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployParams {
    /// Azure subscription. Falls back to the one reported by the token source.
    pub subscription_id: Option<String>,
    pub resource_group: String,
    pub container_app_name: String,
    pub image: String,
    /// Defaults to the container app name.
    pub container_name: Option<String>,
    pub revision_suffix: Option<String>,
    pub commit_hash: Option<String>,
    /// Deactivate the named revision instead of deploying a new one.
    pub deactivate: bool,
    pub dapr: DaprParams,
    pub ingress: IngressParams,
    pub scale: ScaleParams,
    pub poll: PollParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaprParams {
    pub enabled: Option<bool>,
    pub app_id: Option<String>,
    pub app_port: Option<u16>,
    pub app_protocol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngressParams {
    pub external: Option<bool>,
    pub target_port: Option<u16>,
    pub custom_domains: Option<Vec<CustomDomain>>,
    pub traffic: Option<Vec<TrafficEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScaleParams {
    pub min_replicas: Option<u32>,
    pub max_replicas: Option<u32>,
    pub rules: Option<Vec<ScaleRule>>,
}

/// How the client waits for a submitted envelope to settle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollParams {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for PollParams {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            timeout_secs: 1800,
        }
    }
}

impl PollParams {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DeployParams {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the parameters into an immutable rollout description.
    pub fn desired_rollout(&self) -> ConfigResult<DesiredRollout> {
        let container_app_name = required(&self.container_app_name, "container-app-name")?;
        required(&self.resource_group, "resource-group")?;
        let image = if self.deactivate {
            self.image.trim().to_string()
        } else {
            required(&self.image, "image")?
        };

        let revision_suffix = self.effective_revision_suffix()?;
        if self.deactivate && revision_suffix.is_none() {
            return Err(ConfigError::DeactivateWithoutRevision);
        }

        if let Some(traffic) = &self.ingress.traffic {
            for entry in traffic {
                if entry.weight > 100 {
                    let target = entry
                        .revision_name
                        .clone()
                        .unwrap_or_else(|| "latest revision".to_string());
                    return Err(ConfigError::InvalidWeight {
                        target,
                        weight: entry.weight,
                    });
                }
            }
        }

        if let (Some(min), Some(max)) = (self.scale.min_replicas, self.scale.max_replicas) {
            if min > max {
                return Err(ConfigError::ReplicaBounds { min, max });
            }
        }

        if self.poll.interval_secs == 0 {
            return Err(ConfigError::InvalidPoll("interval"));
        }
        if self.poll.timeout_secs == 0 {
            return Err(ConfigError::InvalidPoll("timeout"));
        }

        let container_name = self
            .container_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| container_app_name.clone());

        Ok(DesiredRollout {
            container_app_name,
            container_name,
            image,
            revision_suffix,
            ingress: IngressOverrides {
                external: self.ingress.external,
                target_port: self.ingress.target_port,
                custom_domains: self.ingress.custom_domains.clone(),
                traffic: self.ingress.traffic.clone(),
            },
            scale: ScaleOverrides {
                min_replicas: self.scale.min_replicas,
                max_replicas: self.scale.max_replicas,
                rules: self.scale.rules.clone().filter(|rules| !rules.is_empty()),
            },
            dapr: self.dapr.overrides(),
            deactivate: self.deactivate,
        })
    }

    /// Explicit suffix, else one derived from the commit hash.
    fn effective_revision_suffix(&self) -> ConfigResult<Option<String>> {
        if let Some(suffix) = non_empty(self.revision_suffix.as_deref()) {
            if !is_valid_suffix(suffix) {
                return Err(ConfigError::InvalidRevisionSuffix(suffix.to_string()));
            }
            return Ok(Some(suffix.to_string()));
        }

        match non_empty(self.commit_hash.as_deref()) {
            Some(hash) => {
                let suffix: String = hash
                    .chars()
                    .take(COMMIT_SUFFIX_LEN)
                    .collect::<String>()
                    .to_ascii_lowercase();
                if !is_valid_suffix(&suffix) {
                    return Err(ConfigError::InvalidRevisionSuffix(suffix));
                }
                Ok(Some(suffix))
            }
            None => Ok(None),
        }
    }
}

impl DaprParams {
    /// Explicit dapr settings, or `None` when no dapr parameter was given.
    fn overrides(&self) -> Option<DaprOverrides> {
        let app_id = non_empty(self.app_id.as_deref()).map(str::to_string);
        let app_protocol = non_empty(self.app_protocol.as_deref()).map(str::to_string);

        if self.enabled.is_none()
            && app_id.is_none()
            && self.app_port.is_none()
            && app_protocol.is_none()
        {
            return None;
        }

        Some(DaprOverrides {
            enabled: self.enabled,
            app_id,
            app_port: self.app_port,
            app_protocol,
        })
    }
}

fn required(value: &str, name: &'static str) -> ConfigResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(trimmed.to_string())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn is_valid_suffix(suffix: &str) -> bool {
    !suffix.is_empty()
        && !suffix.starts_with('-')
        && !suffix.ends_with('-')
        && suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> DeployParams {
        DeployParams {
            resource_group: "rg".to_string(),
            container_app_name: "app".to_string(),
            image: "registry/img:2".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_minimal() {
        let toml_str = r#"
resource_group = "rg"
container_app_name = "app"
image = "registry/img:2"
"#;
        let params: DeployParams = toml::from_str(toml_str).unwrap();
        assert_eq!(params.container_app_name, "app");
        assert_eq!(params.poll, PollParams::default());
        assert!(!params.deactivate);
    }

    #[test]
    fn test_parse_sections() {
        let toml_str = r#"
resource_group = "rg"
container_app_name = "app"
image = "registry/img:2"
revision_suffix = "v2"

[ingress]
external = true
target_port = 8080
custom_domains = [{ name = "api.example.com", certificateId = "/certs/api" }]

[scale]
min_replicas = 1
max_replicas = 3
rules = [{ name = "http", http = { metadata = { concurrentRequests = "10" } } }]

[dapr]
enabled = true
app_port = 3000
"#;
        let params: DeployParams = toml::from_str(toml_str).unwrap();
        let rollout = params.desired_rollout().unwrap();
        assert_eq!(rollout.ingress.external, Some(true));
        assert_eq!(rollout.ingress.custom_domains.unwrap()[0].name, "api.example.com");
        assert_eq!(rollout.scale.rules.unwrap()[0].name, "http");
        assert_eq!(rollout.dapr.unwrap().app_port, Some(3000));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let toml_str = r#"
resource_group = "rg"
container_app_name = "app"
imag = "typo"
"#;
        assert!(toml::from_str::<DeployParams>(toml_str).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.toml");
        std::fs::write(
            &path,
            "resource_group = \"rg\"\ncontainer_app_name = \"app\"\nimage = \"img\"\n",
        )
        .unwrap();
        let params = DeployParams::from_file(&path).unwrap();
        assert_eq!(params.image, "img");

        let missing = DeployParams::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn required_fields_are_checked() {
        let params = DeployParams {
            image: "  ".to_string(),
            ..base_params()
        };
        assert!(matches!(
            params.desired_rollout(),
            Err(ConfigError::Missing("image"))
        ));
    }

    #[test]
    fn container_name_defaults_to_app() {
        let rollout = base_params().desired_rollout().unwrap();
        assert_eq!(rollout.container_name, "app");
        assert_eq!(rollout.revision_suffix, None);
        assert!(rollout.dapr.is_none());
    }

    #[test]
    fn suffix_derived_from_commit_hash() {
        let params = DeployParams {
            commit_hash: Some("3F2A9C1D77E0B4".to_string()),
            ..base_params()
        };
        let rollout = params.desired_rollout().unwrap();
        assert_eq!(rollout.revision_suffix.as_deref(), Some("3f2a9c1d"));
    }

    #[test]
    fn explicit_suffix_wins_and_is_validated() {
        let params = DeployParams {
            revision_suffix: Some("blue".to_string()),
            commit_hash: Some("abcdef123".to_string()),
            ..base_params()
        };
        assert_eq!(
            params.desired_rollout().unwrap().revision_suffix.as_deref(),
            Some("blue")
        );

        let bad = DeployParams {
            revision_suffix: Some("Blue_1".to_string()),
            ..base_params()
        };
        assert!(matches!(
            bad.desired_rollout(),
            Err(ConfigError::InvalidRevisionSuffix(_))
        ));
    }

    #[test]
    fn deactivation_needs_a_revision() {
        let params = DeployParams {
            deactivate: true,
            image: String::new(),
            ..base_params()
        };
        assert!(matches!(
            params.desired_rollout(),
            Err(ConfigError::DeactivateWithoutRevision)
        ));

        let named = DeployParams {
            revision_suffix: Some("old".to_string()),
            ..params
        };
        assert!(named.desired_rollout().unwrap().deactivate);
    }

    #[test]
    fn empty_dapr_protocol_is_dropped() {
        let params = DeployParams {
            dapr: DaprParams {
                app_protocol: Some(String::new()),
                ..Default::default()
            },
            ..base_params()
        };
        assert!(params.desired_rollout().unwrap().dapr.is_none());

        let enabled = DeployParams {
            dapr: DaprParams {
                enabled: Some(true),
                app_protocol: Some(String::new()),
                ..Default::default()
            },
            ..base_params()
        };
        let dapr = enabled.desired_rollout().unwrap().dapr.unwrap();
        assert_eq!(dapr.enabled, Some(true));
        assert_eq!(dapr.app_protocol, None);
    }

    #[test]
    fn weights_and_bounds_are_validated() {
        let params = DeployParams {
            ingress: IngressParams {
                traffic: Some(vec![TrafficEntry::named("app--a", 150)]),
                ..Default::default()
            },
            ..base_params()
        };
        assert!(matches!(
            params.desired_rollout(),
            Err(ConfigError::InvalidWeight { weight: 150, .. })
        ));

        let params = DeployParams {
            scale: ScaleParams {
                min_replicas: Some(5),
                max_replicas: Some(2),
                rules: None,
            },
            ..base_params()
        };
        assert!(matches!(
            params.desired_rollout(),
            Err(ConfigError::ReplicaBounds { min: 5, max: 2 })
        ));
    }

    #[test]
    fn zero_poll_settings_are_rejected() {
        let params = DeployParams {
            poll: PollParams {
                interval_secs: 0,
                timeout_secs: 60,
            },
            ..base_params()
        };
        assert!(matches!(
            params.desired_rollout(),
            Err(ConfigError::InvalidPoll("interval"))
        ));

        let params = DeployParams {
            poll: PollParams {
                interval_secs: 5,
                timeout_secs: 0,
            },
            ..base_params()
        };
        assert!(matches!(
            params.desired_rollout(),
            Err(ConfigError::InvalidPoll("timeout"))
        ));
    }

    #[test]
    fn empty_rule_list_means_default() {
        let params = DeployParams {
            scale: ScaleParams {
                rules: Some(Vec::new()),
                ..Default::default()
            },
            ..base_params()
        };
        assert!(params.desired_rollout().unwrap().scale.rules.is_none());
    }
}

//! Reconciler: merges remote state with a desired rollout.
//!
//! `reconcile` is a pure function of its inputs. Optional envelope keys are
//! decided here once, as `Option`s, rather than being pruned afterwards.

use aca_core::{
    ApplicationState, Configuration, Container, Dapr, DaprOverrides, DeploymentEnvelope,
    DesiredRollout, Ingress, IngressState, Scale, ScaleRule, ScaleState, Template,
};
use tracing::debug;

use crate::error::{RolloutError, RolloutResult};
use crate::traffic::{next_traffic, pin_latest};

/// Build the deployment envelope for `desired` on top of `remote`.
///
/// Fails with `IncompleteRemoteState` if the remote application lacks its
/// ingress or scale block, a replica bound that is not overridden, its
/// managed environment, or its location, or if live `latestRevision`
/// traffic cannot be pinned to a named revision.
pub fn reconcile(
    remote: &ApplicationState,
    desired: &DesiredRollout,
) -> RolloutResult<DeploymentEnvelope> {
    let remote_ingress = remote
        .ingress
        .as_ref()
        .ok_or(RolloutError::IncompleteRemoteState {
            field: "configuration.ingress",
        })?;
    let remote_scale = remote
        .scale
        .as_ref()
        .ok_or(RolloutError::IncompleteRemoteState {
            field: "template.scale",
        })?;
    let managed_environment_id = remote.managed_environment_id.clone().ok_or(
        RolloutError::IncompleteRemoteState {
            field: "managedEnvironmentId",
        },
    )?;
    let location = remote
        .location
        .clone()
        .ok_or(RolloutError::IncompleteRemoteState { field: "location" })?;

    let configuration = Configuration {
        dapr: reconcile_dapr(remote.dapr.as_ref(), desired.dapr.as_ref()),
        ingress: reconcile_ingress(
            remote_ingress,
            remote.latest_revision_name.as_deref(),
            desired,
        )?,
    };

    let template = Template {
        containers: vec![Container {
            name: desired.container_name.clone(),
            image: desired.image.clone(),
        }],
        scale: reconcile_scale(remote_scale, desired)?,
        revision_suffix: desired.revision_suffix.clone(),
    };

    debug!(
        app = %desired.container_app_name,
        external = configuration.ingress.is_some(),
        suffix = ?template.revision_suffix,
        "reconciled deployment envelope"
    );

    Ok(DeploymentEnvelope {
        configuration,
        location,
        managed_environment_id,
        template,
    })
}

/// Explicit overrides replace the remote block entirely.
fn reconcile_dapr(remote: Option<&Dapr>, overrides: Option<&DaprOverrides>) -> Dapr {
    match overrides {
        Some(o) => Dapr {
            enabled: o.enabled,
            app_id: o.app_id.clone(),
            app_port: o.app_port,
            app_protocol: o.app_protocol.clone().filter(|p| !p.is_empty()),
            extra: Default::default(),
        },
        None => remote.cloned().unwrap_or_default(),
    }
}

/// `None` unless the app is externally reachable.
fn reconcile_ingress(
    remote: &IngressState,
    latest_revision: Option<&str>,
    desired: &DesiredRollout,
) -> RolloutResult<Option<Ingress>> {
    let overrides = &desired.ingress;
    let external = overrides.external.or(remote.external).unwrap_or(false);
    if !external {
        return Ok(None);
    }

    let current = overrides
        .traffic
        .as_deref()
        .unwrap_or(remote.traffic.as_slice());
    let current = pin_latest(current, latest_revision)?;
    let traffic = next_traffic(&current, &desired.new_revision());

    let custom_domains = overrides
        .custom_domains
        .clone()
        .or_else(|| remote.custom_domains.clone())
        .unwrap_or_default();

    Ok(Some(Ingress {
        external,
        target_port: overrides.target_port.or(remote.target_port),
        traffic: (!traffic.is_empty()).then_some(traffic),
        custom_domains,
    }))
}

fn reconcile_scale(remote: &ScaleState, desired: &DesiredRollout) -> RolloutResult<Scale> {
    let overrides = &desired.scale;
    let min_replicas = overrides.min_replicas.or(remote.min_replicas).ok_or(
        RolloutError::IncompleteRemoteState {
            field: "template.scale.minReplicas",
        },
    )?;
    let max_replicas = overrides.max_replicas.or(remote.max_replicas).ok_or(
        RolloutError::IncompleteRemoteState {
            field: "template.scale.maxReplicas",
        },
    )?;

    let rules = match &overrides.rules {
        Some(rules) if !rules.is_empty() => rules.clone(),
        _ => vec![ScaleRule::default_http()],
    };

    Ok(Scale {
        min_replicas,
        max_replicas,
        rules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aca_core::{
        CustomDomain, CustomScaleRule, IngressOverrides, ScaleOverrides, TrafficEntry,
    };
    use std::collections::BTreeMap;

    fn remote_state(external: Option<bool>) -> ApplicationState {
        ApplicationState {
            ingress: Some(IngressState {
                external,
                target_port: Some(80),
                traffic: vec![TrafficEntry::named("app--old", 100)],
                custom_domains: None,
            }),
            scale: Some(ScaleState {
                min_replicas: Some(0),
                max_replicas: Some(10),
            }),
            dapr: Some(Dapr {
                enabled: Some(false),
                ..Default::default()
            }),
            managed_environment_id: Some(
                "/subscriptions/s/resourceGroups/rg/providers/Microsoft.App/managedEnvironments/env"
                    .to_string(),
            ),
            location: Some("westeurope".to_string()),
            ..Default::default()
        }
    }

    fn desired() -> DesiredRollout {
        DesiredRollout {
            container_app_name: "app".to_string(),
            container_name: "app".to_string(),
            image: "registry/img:2".to_string(),
            revision_suffix: Some("new".to_string()),
            ingress: IngressOverrides::default(),
            scale: ScaleOverrides::default(),
            dapr: None,
            deactivate: false,
        }
    }

    #[test]
    fn external_app_gets_staged_traffic() {
        let envelope = reconcile(&remote_state(Some(true)), &desired()).unwrap();
        let ingress = envelope.configuration.ingress.as_ref().unwrap();

        assert_eq!(
            ingress.traffic.as_deref().unwrap(),
            &[
                TrafficEntry::named("app--old", 100),
                TrafficEntry::named("app--new", 0),
            ]
        );
        assert_eq!(ingress.target_port, Some(80));
        assert!(ingress.custom_domains.is_empty());

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["configuration"]["ingress"]["customDomains"], serde_json::json!([]));
        assert_eq!(json["template"]["revisionSuffix"], "new");
        assert_eq!(
            json["template"]["containers"],
            serde_json::json!([{"name": "app", "image": "registry/img:2"}])
        );
    }

    #[test]
    fn internal_app_has_no_ingress_key() {
        for external in [Some(false), None] {
            let envelope = reconcile(&remote_state(external), &desired()).unwrap();
            assert!(envelope.configuration.ingress.is_none());

            let json = serde_json::to_value(&envelope).unwrap();
            assert!(json["configuration"].get("ingress").is_none());
        }
    }

    #[test]
    fn external_override_wins_over_remote() {
        let mut rollout = desired();
        rollout.ingress.external = Some(true);
        rollout.ingress.target_port = Some(8080);
        let envelope = reconcile(&remote_state(Some(false)), &rollout).unwrap();
        let ingress = envelope.configuration.ingress.unwrap();
        assert!(ingress.external);
        assert_eq!(ingress.target_port, Some(8080));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let remote = remote_state(Some(true));
        let rollout = desired();
        let first = reconcile(&remote, &rollout).unwrap();
        let second = reconcile(&remote, &rollout).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn missing_ingress_or_scale_is_incomplete() {
        let mut remote = remote_state(Some(true));
        remote.ingress = None;
        assert!(matches!(
            reconcile(&remote, &desired()),
            Err(RolloutError::IncompleteRemoteState {
                field: "configuration.ingress"
            })
        ));

        let mut remote = remote_state(Some(true));
        remote.scale = None;
        assert!(matches!(
            reconcile(&remote, &desired()),
            Err(RolloutError::IncompleteRemoteState {
                field: "template.scale"
            })
        ));
    }

    #[test]
    fn missing_replica_bound_can_be_overridden() {
        let mut remote = remote_state(Some(true));
        remote.scale = Some(ScaleState {
            min_replicas: Some(1),
            max_replicas: None,
        });
        assert!(matches!(
            reconcile(&remote, &desired()),
            Err(RolloutError::IncompleteRemoteState {
                field: "template.scale.maxReplicas"
            })
        ));

        let mut rollout = desired();
        rollout.scale.max_replicas = Some(4);
        let envelope = reconcile(&remote, &rollout).unwrap();
        assert_eq!(envelope.template.scale.min_replicas, 1);
        assert_eq!(envelope.template.scale.max_replicas, 4);
    }

    #[test]
    fn default_rule_unless_rules_given() {
        let envelope = reconcile(&remote_state(Some(true)), &desired()).unwrap();
        assert_eq!(envelope.template.scale.rules, vec![ScaleRule::default_http()]);

        let mut metadata = BTreeMap::new();
        metadata.insert("desiredReplicas".to_string(), "2".to_string());
        let cron = ScaleRule {
            name: "business-hours".to_string(),
            custom: Some(CustomScaleRule {
                kind: "cron".to_string(),
                metadata,
                auth: Vec::new(),
            }),
            http: None,
        };
        let mut rollout = desired();
        rollout.scale.rules = Some(vec![cron.clone()]);
        let envelope = reconcile(&remote_state(Some(true)), &rollout).unwrap();
        assert_eq!(envelope.template.scale.rules, vec![cron]);
    }

    #[test]
    fn dapr_from_remote_or_overrides() {
        let remote = remote_state(Some(true));
        let envelope = reconcile(&remote, &desired()).unwrap();
        assert_eq!(Some(&envelope.configuration.dapr), remote.dapr.as_ref());

        let mut rollout = desired();
        rollout.dapr = Some(DaprOverrides {
            enabled: Some(true),
            app_id: None,
            app_port: None,
            app_protocol: Some(String::new()),
        });
        let envelope = reconcile(&remote, &rollout).unwrap();
        assert_eq!(
            serde_json::to_value(&envelope.configuration.dapr).unwrap(),
            serde_json::json!({"enabled": true})
        );

        let mut bare = remote_state(Some(true));
        bare.dapr = None;
        let envelope = reconcile(&bare, &desired()).unwrap();
        assert_eq!(
            serde_json::to_value(&envelope.configuration.dapr).unwrap(),
            serde_json::json!({})
        );
    }

    #[test]
    fn custom_domains_from_remote_or_override() {
        let domain = CustomDomain {
            name: "api.example.com".to_string(),
            certificate_id: Some("/certs/api".to_string()),
            binding_type: Some("SniEnabled".to_string()),
        };
        let mut remote = remote_state(Some(true));
        if let Some(ingress) = remote.ingress.as_mut() {
            ingress.custom_domains = Some(vec![domain.clone()]);
        }
        let envelope = reconcile(&remote, &desired()).unwrap();
        assert_eq!(envelope.configuration.ingress.unwrap().custom_domains, vec![domain]);

        let mut rollout = desired();
        rollout.ingress.custom_domains = Some(Vec::new());
        let envelope = reconcile(&remote, &rollout).unwrap();
        assert!(envelope.configuration.ingress.unwrap().custom_domains.is_empty());
    }

    #[test]
    fn traffic_override_replaces_remote_list() {
        let mut rollout = desired();
        rollout.ingress.traffic = Some(vec![
            TrafficEntry::named("app--blue", 50),
            TrafficEntry::named("app--green", 50),
        ]);
        let envelope = reconcile(&remote_state(Some(true)), &rollout).unwrap();
        let traffic = envelope.configuration.ingress.unwrap().traffic.unwrap();
        let names: Vec<_> = traffic.iter().filter_map(|e| e.revision_name.as_deref()).collect();
        assert_eq!(names, vec!["app--blue", "app--green", "app--new"]);
    }

    #[test]
    fn latest_revision_traffic_stays_with_current_revision() {
        let mut remote = remote_state(Some(true));
        remote.latest_revision_name = Some("app--old".to_string());
        if let Some(ingress) = remote.ingress.as_mut() {
            ingress.traffic = vec![TrafficEntry {
                revision_name: None,
                weight: 100,
                latest_revision: true,
                label: None,
            }];
        }

        let envelope = reconcile(&remote, &desired()).unwrap();
        assert_eq!(
            envelope.configuration.ingress.unwrap().traffic.unwrap(),
            vec![
                TrafficEntry::named("app--old", 100),
                TrafficEntry::named("app--new", 0),
            ]
        );

        remote.latest_revision_name = None;
        assert!(matches!(
            reconcile(&remote, &desired()),
            Err(RolloutError::IncompleteRemoteState {
                field: "latestRevisionName"
            })
        ));
    }

    #[test]
    fn unnamed_revision_omits_suffix() {
        let mut rollout = desired();
        rollout.revision_suffix = None;
        let envelope = reconcile(&remote_state(Some(true)), &rollout).unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json["template"].get("revisionSuffix").is_none());

        let traffic = envelope.configuration.ingress.unwrap().traffic.unwrap();
        assert!(traffic.last().unwrap().latest_revision);
    }
}

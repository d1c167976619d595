//! HTTPS client for the Azure Resource Manager container-app endpoints.

use std::time::Duration;

use aca_core::{
    ApplicationState, ControlPlane, DeploymentEnvelope, ProvisioningState, RemoteError,
    RemoteResult, SubmitOutcome,
};
use reqwest::{Response, StatusCode};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::auth::AccessToken;
use crate::wire::{ContainerAppPut, ContainerAppResource};

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_API_VERSION: &str = "2022-03-01";

/// Where and how to reach the management endpoint.
#[derive(Debug, Clone)]
pub struct ArmConfig {
    pub endpoint: String,
    pub subscription_id: String,
    pub api_version: String,
    pub user_agent: Option<String>,
    /// Delay between provisioning-state checks after a submit.
    pub poll_interval: Duration,
    /// Give up waiting for a terminal provisioning state after this long.
    pub poll_timeout: Duration,
}

impl ArmConfig {
    pub fn new(subscription_id: &str) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            subscription_id: subscription_id.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            user_agent: None,
            poll_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(1800),
        }
    }
}

/// `ControlPlane` implementation over ARM REST calls.
pub struct ArmClient {
    http: reqwest::Client,
    config: ArmConfig,
    token: AccessToken,
}

impl ArmClient {
    pub fn new(config: ArmConfig, token: AccessToken) -> RemoteResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let http = builder.build().map_err(transport)?;
        Ok(Self {
            http,
            config,
            token,
        })
    }

    fn app_path(&self, resource_group: &str, app: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.App/containerApps/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.subscription_id,
            resource_group,
            app
        )
    }

    fn with_api_version(&self, path: &str) -> String {
        format!("{path}?api-version={}", self.config.api_version)
    }

    async fn get_resource(
        &self,
        resource_group: &str,
        app: &str,
    ) -> RemoteResult<ContainerAppResource> {
        let url = self.with_api_version(&self.app_path(resource_group, app));
        debug!(%url, "GET container app");
        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.token.secret())
            .send()
            .await
            .map_err(transport)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound {
                resource_group: resource_group.to_string(),
                app: app.to_string(),
            });
        }
        let body = checked_body(resp).await?;
        parse_resource(&body)
    }

    /// Poll until the app reaches a terminal provisioning state.
    async fn wait_for_terminal(
        &self,
        resource_group: &str,
        app: &str,
        mut state: ProvisioningState,
        mut fqdn: Option<String>,
    ) -> RemoteResult<SubmitOutcome> {
        let deadline = Instant::now() + self.config.poll_timeout;

        while !state.is_terminal() {
            if Instant::now() >= deadline {
                return Err(RemoteError::Incomplete(format!(
                    "{app} still {state} after {:?}",
                    self.config.poll_timeout
                )));
            }
            debug!(app, %state, "waiting for provisioning to finish");
            tokio::time::sleep(self.config.poll_interval).await;

            let resource = self.get_resource(resource_group, app).await?;
            state = resource
                .provisioning_state()
                .unwrap_or(ProvisioningState::InProgress);
            fqdn = resource.latest_revision_fqdn();
        }

        Ok(SubmitOutcome {
            provisioning_state: state,
            latest_revision_fqdn: fqdn,
        })
    }
}

impl ControlPlane for ArmClient {
    async fn fetch_application_state(
        &self,
        resource_group: &str,
        app: &str,
    ) -> RemoteResult<ApplicationState> {
        let resource = self.get_resource(resource_group, app).await?;
        Ok(ApplicationState::from(resource))
    }

    async fn submit_envelope(
        &self,
        resource_group: &str,
        app: &str,
        envelope: &DeploymentEnvelope,
    ) -> RemoteResult<SubmitOutcome> {
        let url = self.with_api_version(&self.app_path(resource_group, app));
        let body = ContainerAppPut::from(envelope);
        info!(app, "PUT container app");
        let resp = self
            .http
            .put(&url)
            .bearer_auth(self.token.secret())
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let text = checked_body(resp).await?;

        // 202 responses may carry no body; the poll below picks the state up.
        let (state, fqdn) = if text.trim().is_empty() {
            (ProvisioningState::InProgress, None)
        } else {
            let resource = parse_resource(&text)?;
            (
                resource
                    .provisioning_state()
                    .unwrap_or(ProvisioningState::InProgress),
                resource.latest_revision_fqdn(),
            )
        };

        self.wait_for_terminal(resource_group, app, state, fqdn).await
    }

    async fn deactivate_revision(
        &self,
        resource_group: &str,
        app: &str,
        revision: &str,
    ) -> RemoteResult<()> {
        let path = format!(
            "{}/revisions/{}/deactivate",
            self.app_path(resource_group, app),
            revision
        );
        let url = self.with_api_version(&path);
        info!(app, revision, "POST deactivate revision");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.token.secret())
            .send()
            .await
            .map_err(transport)?;
        checked_body(resp).await?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

/// Body of a successful response; anything else becomes `Rejected` with the
/// body passed through unchanged.
async fn checked_body(resp: Response) -> RemoteResult<String> {
    let status = resp.status();
    let body = resp.text().await.map_err(transport)?;
    if !status.is_success() {
        return Err(RemoteError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn parse_resource(body: &str) -> RemoteResult<ContainerAppResource> {
    serde_json::from_str(body)
        .map_err(|e| RemoteError::Transport(format!("unexpected response body: {e}")))
}

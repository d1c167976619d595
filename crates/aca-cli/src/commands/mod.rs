pub mod deploy;
pub mod plan;

use aca_client::{AccessToken, ArmClient, ArmConfig};
use aca_core::config::DeployParams;
use anyhow::Context;
use tracing::debug;

/// Authenticate and build the ARM client for `params`.
pub async fn connect(params: &DeployParams, user_agent: &str) -> anyhow::Result<ArmClient> {
    let token = AccessToken::acquire()
        .await
        .context("failed to acquire an access token")?;

    let subscription_id = params
        .subscription_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| token.subscription.clone())
        .context("no subscription id configured and none reported by the azure cli")?;
    debug!(subscription = %subscription_id, "using subscription");

    let mut config = ArmConfig::new(&subscription_id);
    config.user_agent = Some(user_agent.to_string());
    config.poll_interval = params.poll.interval();
    config.poll_timeout = params.poll.timeout();

    Ok(ArmClient::new(config, token)?)
}

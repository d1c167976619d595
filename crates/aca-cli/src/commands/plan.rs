use aca_core::config::DeployParams;
use aca_rollout::Rollout;

use super::connect;

/// Print the envelope a deploy would submit, without submitting it.
pub async fn plan(params: DeployParams, user_agent: &str) -> anyhow::Result<()> {
    let desired = params.desired_rollout()?;
    let client = connect(&params, user_agent).await?;

    let mut rollout = Rollout::new(&params.resource_group, desired);
    let envelope = rollout.plan(&client).await?;

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

use aca_core::config::DeployParams;
use aca_rollout::{Rollout, RolloutOutcome};

use super::connect;
use crate::actions::Workflow;

pub async fn deploy(
    params: DeployParams,
    workflow: &Workflow,
    user_agent: &str,
) -> anyhow::Result<()> {
    let desired = params.desired_rollout()?;
    let client = connect(&params, user_agent).await?;

    let mut rollout = Rollout::new(&params.resource_group, desired);
    match rollout.run(&client).await? {
        RolloutOutcome::Deployed { app_url, .. } => {
            println!("✓ Deployment succeeded");
            if let Some(url) = app_url {
                workflow.set_output("app-url", &url)?;
                println!("  Your app has been deployed at: {url}");
            }
        }
        RolloutOutcome::Deactivated { revision } => {
            println!("✓ Revision {revision} deactivated");
        }
    }
    Ok(())
}

use std::path::PathBuf;

use aca_core::config::DeployParams;
use clap::{Parser, Subcommand};
use tracing::warn;

mod actions;
mod args;
mod commands;

use actions::{Workflow, USER_AGENT_ENV};
use args::ParamArgs;

#[derive(Parser)]
#[command(
    name = "aca-deploy",
    about = "Roll out a new revision of an Azure container app",
    version,
    propagate_version = true,
)]
struct Cli {
    /// TOML file with deployment parameters; flags override its values
    #[arg(short, long, global = true, env = "ACA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the image as a new revision at zero traffic.
    ///
    /// With --deactivate, deactivate the revision named by the suffix
    /// instead; this is refused while the revision still receives traffic.
    Deploy {
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Print the envelope `deploy` would submit, without submitting it
    Plan {
        #[command(flatten)]
        params: ParamArgs,
    },
}

fn load_params(config: Option<&PathBuf>, args: ParamArgs) -> anyhow::Result<DeployParams> {
    let base = match config {
        Some(path) => DeployParams::from_file(path)?,
        None => DeployParams::default(),
    };
    Ok(args.apply(base))
}

async fn run(cli: Cli, workflow: &Workflow, user_agent: &str) -> anyhow::Result<()> {
    match cli.command {
        Commands::Deploy { params } => {
            let params = load_params(cli.config.as_ref(), params)?;
            commands::deploy::deploy(params, workflow, user_agent).await
        }
        Commands::Plan { params } => {
            let params = load_params(cli.config.as_ref(), params)?;
            commands::plan::plan(params, user_agent).await
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aca=info".parse()?)
        )
        .init();

    let cli = Cli::parse();
    let workflow = Workflow::from_env();

    let prefix = std::env::var(USER_AGENT_ENV).unwrap_or_default();
    let repository = std::env::var("GITHUB_REPOSITORY").unwrap_or_default();
    let user_agent = actions::user_agent(&prefix, &repository);
    workflow.export_variable(USER_AGENT_ENV, &user_agent)?;

    let result = run(cli, &workflow, &user_agent).await;
    if let Err(err) = &result {
        workflow.fail(&format!("Deployment failed: {err:#}"));
    }

    restore_user_agent(&workflow, &prefix, result)
}

/// Hand the incoming user agent back to later steps. A failure to do so is
/// logged; it never replaces the outcome of the run.
fn restore_user_agent(
    workflow: &Workflow,
    prefix: &str,
    result: anyhow::Result<()>,
) -> anyhow::Result<()> {
    if let Err(err) = workflow.export_variable(USER_AGENT_ENV, prefix) {
        warn!(error = %err, "failed to restore {USER_AGENT_ENV}");
    }
    result
}

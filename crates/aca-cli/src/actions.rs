//! GitHub Actions integration: user agent, step outputs, and exported
//! variables.
//!
//! Outside a workflow run (no `GITHUB_ENV` / `GITHUB_OUTPUT`) every call is a
//! no-op apart from a debug log line.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

/// Variable carrying the user agent shared by Azure tooling in a workflow.
pub const USER_AGENT_ENV: &str = "AZURE_HTTP_USER_AGENT";

const ACTION_NAME: &str = "DeployAzureContainerApp";

/// User agent for this run: the incoming prefix plus an action marker keyed
/// by a hash of the repository name.
pub fn user_agent(prefix: &str, repository: &str) -> String {
    let digest = hex::encode(Sha256::digest(repository.as_bytes()));
    let agent = format!("GITHUBACTIONS_{ACTION_NAME}_{digest}");
    if prefix.is_empty() {
        agent
    } else {
        format!("{prefix}+{agent}")
    }
}

/// Files the workflow runner reads back after the step.
#[derive(Debug, Clone, Default)]
pub struct Workflow {
    env_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

impl Workflow {
    pub fn new(env_file: Option<PathBuf>, output_file: Option<PathBuf>) -> Self {
        Self {
            env_file,
            output_file,
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("GITHUB_ENV").map(PathBuf::from),
            std::env::var_os("GITHUB_OUTPUT").map(PathBuf::from),
        )
    }

    /// Make `name=value` visible to later workflow steps.
    pub fn export_variable(&self, name: &str, value: &str) -> std::io::Result<()> {
        match &self.env_file {
            Some(path) => append_line(path, name, value),
            None => {
                debug!(name, value, "not in a workflow, skipping variable export");
                Ok(())
            }
        }
    }

    /// Set a step output.
    pub fn set_output(&self, name: &str, value: &str) -> std::io::Result<()> {
        match &self.output_file {
            Some(path) => append_line(path, name, value),
            None => {
                debug!(name, value, "not in a workflow, skipping output");
                Ok(())
            }
        }
    }

    /// Annotate the run as failed.
    pub fn fail(&self, message: &str) {
        // Workflow commands are single-line; escape as the runner expects.
        let escaped = message
            .replace('%', "%25")
            .replace('\r', "%0D")
            .replace('\n', "%0A");
        println!("::error::{escaped}");
    }
}

fn append_line(path: &Path, name: &str, value: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{name}={value}")
}

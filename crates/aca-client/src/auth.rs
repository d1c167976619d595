//! Access tokens for the management endpoint.

use aca_core::{RemoteError, RemoteResult};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

/// Environment variable holding a ready-made bearer token.
pub const TOKEN_ENV: &str = "ACA_ACCESS_TOKEN";

const MANAGEMENT_RESOURCE: &str = "https://management.azure.com/";

/// A bearer token, plus the subscription it was issued for when known.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    pub subscription: Option<String>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("subscription", &self.subscription)
            .finish()
    }
}

/// Output of `az account get-access-token --output json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    #[serde(default)]
    subscription: Option<String>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            subscription: None,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Take the token from `ACA_ACCESS_TOKEN`, else ask the Azure CLI.
    pub async fn acquire() -> RemoteResult<Self> {
        if let Ok(secret) = std::env::var(TOKEN_ENV) {
            if !secret.trim().is_empty() {
                debug!("using access token from {TOKEN_ENV}");
                return Ok(Self::new(secret.trim()));
            }
        }
        Self::from_azure_cli().await
    }

    async fn from_azure_cli() -> RemoteResult<Self> {
        debug!("requesting access token from the azure cli");
        let output = Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                MANAGEMENT_RESOURCE,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| RemoteError::Auth(format!("failed to run az: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RemoteError::Auth(format!(
                "az account get-access-token failed: {}",
                stderr.trim()
            )));
        }

        Self::parse_cli_output(&output.stdout)
    }

    fn parse_cli_output(stdout: &[u8]) -> RemoteResult<Self> {
        let token: CliToken = serde_json::from_slice(stdout)
            .map_err(|e| RemoteError::Auth(format!("unexpected az output: {e}")))?;
        Ok(Self {
            secret: token.access_token,
            subscription: token.subscription,
        })
    }
}

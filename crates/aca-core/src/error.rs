//! Error types for deployment parameter loading.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for parameter loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while reading or validating `DeployParams`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing required parameter: {0}")]
    Missing(&'static str),

    #[error("invalid revision suffix {0:?}: use lowercase letters, digits and '-'")]
    InvalidRevisionSuffix(String),

    #[error("traffic weight {weight} for {target} is outside 0-100")]
    InvalidWeight { target: String, weight: u32 },

    #[error("scale-min-replicas ({min}) exceeds scale-max-replicas ({max})")]
    ReplicaBounds { min: u32, max: u32 },

    #[error("poll {0} must be at least one second")]
    InvalidPoll(&'static str),

    #[error("deactivation needs a revision suffix or commit hash to name the revision")]
    DeactivateWithoutRevision,
}

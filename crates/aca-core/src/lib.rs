//! aca-core: shared types, parameters, and the control-plane seam for
//! aca-deploy.
//!
//! - **`types`**: remote snapshot, desired rollout, and deployment envelope
//! - **`config`**: `DeployParams` loading (TOML) and validation
//! - **`remote`**: the `ControlPlane` trait implemented by clients

pub mod config;
pub mod error;
pub mod remote;
pub mod types;

pub use config::DeployParams;
pub use error::{ConfigError, ConfigResult};
pub use remote::{ControlPlane, RemoteError, RemoteResult};
pub use types::*;

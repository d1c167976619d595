//! aca-client: Azure Resource Manager client for container apps.
//!
//! Implements `aca_core::ControlPlane` with three REST calls: GET the app,
//! PUT a new envelope (then poll until provisioning settles), and POST a
//! revision deactivation.

pub mod auth;
pub mod client;
pub mod wire;

pub use auth::AccessToken;
pub use client::{ArmClient, ArmConfig};

//! aca-rollout: reconciliation, traffic weights, and revision deactivation.
//!
//! This crate holds the stateful core of a container-app rollout. Given the
//! fetched application state and the desired rollout it builds the
//! deployment envelope, stages the new revision at zero traffic, and guards
//! revision deactivation.
//!
//! # Components
//!
//! - **`reconciler`**: remote state + desired rollout → deployment envelope
//! - **`traffic`**: traffic list for the next envelope
//! - **`deactivate`**: drained-traffic guard and deactivation call
//! - **`controller`**: one fetch/reconcile/submit cycle

pub mod controller;
pub mod deactivate;
pub mod error;
pub mod reconciler;
pub mod traffic;

pub use controller::{Rollout, RolloutOutcome, RolloutPhase};
pub use deactivate::{DeactivationPhase, DeactivationRequest};
pub use error::{RolloutError, RolloutResult};
pub use reconciler::reconcile;
pub use traffic::{next_traffic, pin_latest};

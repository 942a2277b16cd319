//! # flotilla-fleet
//!
//! Replica-range convergence and lifecycle operations for flotilla projects.
//!
//! A project is a named pool of provider-owned compute instances. This crate
//! converges the pool to a configured `[min, max]` replica range, gives each
//! instance a stable numeric identity that survives instance replacement,
//! and drives the lifecycle operations (start, stop, reboot, terminate,
//! revert) with bounded-retry waiting between provider actions.
//!
//! Key pieces:
//!
//! - [`ProjectConfig`]: one TOML file describing the project
//! - [`Selector`]: whole pool or an explicit set of identity numbers
//! - [`InstanceDirectory`]: the single always-fresh read path
//! - [`TransitionWaiter`]: bounded polling; exhaustion is data, not an error
//! - [`ReplicaPlan`]: the pure convergence decision behind create
//! - [`FleetProject`]: the operational surface
//!
//! The provider is the sole source of truth. Nothing is persisted locally;
//! the instance `Name` tag is the identity ledger.

mod config;
mod directory;
mod error;
mod project;
mod reconciler;
mod selector;
mod ssh;
mod status;
mod waiter;

pub use config::ProjectConfig;
pub use directory::InstanceDirectory;
pub use error::FleetError;
pub use project::FleetProject;
pub use reconciler::ReplicaPlan;
pub use selector::Selector;
pub use ssh::{ExecOutcome, RemoteSession};
pub use status::InstanceStatus;
pub use waiter::TransitionWaiter;

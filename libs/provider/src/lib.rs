//! # flotilla-provider
//!
//! Collaborator contracts for flotilla: the compute provider that owns the
//! instances, and the remote executor that reaches into them.
//!
//! The fleet core never talks to a cloud API directly. Everything goes
//! through [`ComputeProvider`], an async trait covering the handful of calls
//! the core needs: list by tag, create a reservation, tag, the four lifecycle
//! actions, and a per-instance state refresh. SSH probing and remote command
//! execution go through [`RemoteExecutor`].
//!
//! Two implementations ship here:
//!
//! - [`MockProvider`]: an in-memory fleet simulation used by the test
//!   suites and the `mock` backend of the CLI.
//! - [`SshExecutor`]: a thin wrapper over `ssh(1)` for the executor side.
//!
//! Real cloud backends implement [`ComputeProvider`] out of tree.

mod error;
mod exec;
mod instance;
mod mock;
mod provider;

pub use error::ProviderError;
pub use exec::{MockExecutor, RemoteExecutor, SshCredentials, SshExecutor};
pub use instance::{Instance, InstanceState, NetworkInfo};
pub use mock::MockProvider;
pub use provider::{ComputeProvider, InstanceFilter, Reservation, ReservationRequest};

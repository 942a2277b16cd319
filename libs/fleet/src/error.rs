//! Fleet error taxonomy.
//!
//! Only true faults live here. Transition-wait exhaustion is deliberately
//! not an error: the waiter logs it and reports non-convergence as data
//! (see [`crate::waiter`]), and callers proceed on best-available state.
//! SSH-readiness exhaustion, by contrast, *is* fatal: downstream
//! automation depends on reachable hosts.

use thiserror::Error;

use flotilla_identity::IdentityError;
use flotilla_provider::ProviderError;

/// Errors from fleet operations.
#[derive(Debug, Error)]
pub enum FleetError {
    /// The compute provider failed; capacity refusals are distinguishable
    /// via [`ProviderError::is_capacity_exceeded`].
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// An identity tag did not parse. Data-integrity failure.
    #[error("identity tag error: {0}")]
    Identity(#[from] IdentityError),

    /// An operation needed eligible instances and found none.
    #[error("no healthy instances in project '{project}'")]
    NoHealthyInstances { project: String },

    /// The SSH readiness gate exhausted its retry budget.
    #[error(
        "timed out waiting for {pending} instance(s) of project '{project}' to become ssh-ready"
    )]
    SshReadinessTimeout { project: String, pending: usize },

    /// The project configuration failed to load or validate.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

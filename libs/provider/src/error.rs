//! Provider error taxonomy.

use thiserror::Error;

use crate::instance::InstanceState;

/// Errors surfaced by a compute provider.
///
/// Callers need to tell three situations apart: the provider refusing a
/// reservation for capacity reasons, an action issued against an instance in
/// a state that cannot accept it, and everything else. The first aborts a
/// create, the second has per-operation fallbacks, the rest propagate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider could not satisfy even the minimum requested count.
    #[error("instance capacity exceeded: {detail}")]
    CapacityExceeded { detail: String },

    /// The instance's current state cannot accept the requested action.
    #[error("instance {id} cannot {action} while {state}")]
    IncompatibleState {
        id: String,
        action: &'static str,
        state: InstanceState,
    },

    /// No instance with the given id.
    #[error("instance not found: {0}")]
    NotFound(String),

    /// Any other provider API failure (auth, throttling, transport).
    #[error("provider API error: {0}")]
    Api(String),
}

impl ProviderError {
    /// True for capacity refusals.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }

    /// True when an action was refused because of the instance's state.
    pub fn is_incompatible_state(&self) -> bool {
        matches!(self, Self::IncompatibleState { .. })
    }
}

//! Instance snapshots and the provider state enumeration.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flotilla_identity::{IdentityError, NAME_TAG};

/// Lifecycle state of a compute instance.
///
/// The numeric codes match the provider's own numbering and are part of the
/// compatibility contract; they must be preserved exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
}

impl InstanceState {
    /// The provider's numeric state code.
    pub fn code(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 16,
            Self::ShuttingDown => 32,
            Self::Terminated => 48,
            Self::Stopping => 64,
            Self::Stopped => 80,
        }
    }

    /// Look up a state by its provider code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            16 => Some(Self::Running),
            32 => Some(Self::ShuttingDown),
            48 => Some(Self::Terminated),
            64 => Some(Self::Stopping),
            80 => Some(Self::Stopped),
            _ => None,
        }
    }

    /// The provider's string spelling for this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }

    /// A healthy instance is neither terminated nor on its way there.
    pub fn is_healthy(self) -> bool {
        !matches!(self, Self::Terminated | Self::ShuttingDown)
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public and private addressing for an instance.
///
/// All fields are optional: an instance that has not reached `running` may
/// not have been assigned any address yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub public_dns_name: Option<String>,
    pub public_ip_address: Option<String>,
    pub private_dns_name: Option<String>,
    pub private_ip_address: Option<String>,
}

/// A point-in-time snapshot of a provider-owned instance.
///
/// The provider is the sole source of truth; snapshots are transient and go
/// stale as soon as the provider acts. Callers refresh through
/// [`ComputeProvider::refresh`](crate::ComputeProvider::refresh) rather than
/// holding on to these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Provider-assigned identifier, opaque and immutable.
    pub id: String,

    pub state: InstanceState,

    pub network: NetworkInfo,

    /// Free-form tag store; flotilla keeps its identity ledger here.
    pub tags: BTreeMap<String, String>,

    pub image_id: String,
    pub instance_type: String,

    /// Availability zone.
    pub placement: String,

    pub key_name: String,
    pub security_groups: Vec<String>,
    pub launch_time: DateTime<Utc>,
}

impl Instance {
    /// The `Name` tag value, if the instance has been tagged.
    pub fn name_tag(&self) -> Option<&str> {
        self.tags.get(NAME_TAG).map(String::as_str)
    }

    /// The decoded identity number.
    ///
    /// `Ok(None)` when the instance carries no `Name` tag yet (the window
    /// between reservation and tagging); an error when the tag exists but
    /// does not parse.
    pub fn identity_number(&self) -> Result<Option<u32>, IdentityError> {
        match self.name_tag() {
            Some(tag) => flotilla_identity::parse_number(tag).map(Some),
            None => Ok(None),
        }
    }

    /// True if the identity number on this instance has been retired.
    pub fn is_retired(&self) -> bool {
        self.name_tag().is_some_and(flotilla_identity::is_retired)
    }

    pub fn is_healthy(&self) -> bool {
        self.state.is_healthy()
    }
}

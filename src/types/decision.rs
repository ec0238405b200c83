//! Authorization decision types with policy metadata.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// A rendered policy statement: its reconstructed source text and a
/// structured JSON form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
pub struct PermitPolicy {
    pub literal: String,
    pub json: Value,
}

/// Version metadata for the policy set used during an evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
pub struct PolicyVersion {
    /// SHA-256 of the policy source text, hex-encoded.
    pub hash: String,
    /// When this policy set was loaded, as seconds since the Unix epoch.
    pub loaded_at: String,
}

impl PolicyVersion {
    pub(crate) fn new(hash: String) -> Self {
        let loaded_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs().to_string())
            .unwrap_or_else(|_| "0".to_string());
        PolicyVersion { hash, loaded_at }
    }
}

impl Display for PolicyVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} @ {}", self.hash, self.loaded_at)
    }
}

/// Allow or deny decision, including the policy version used. `Allow`
/// carries the first permit statement that granted the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum Decision {
    Allow {
        policy: PermitPolicy,
        version: PolicyVersion,
    },
    Deny {
        version: PolicyVersion,
    },
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    pub fn version(&self) -> &PolicyVersion {
        match self {
            Decision::Allow { version, .. } | Decision::Deny { version } => version,
        }
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Decision::Allow { policy, version } => {
                write!(f, "Allow(hash={}; {})", version.hash, policy.literal)
            }
            Decision::Deny { version } => write!(f, "Deny(hash={})", version.hash),
        }
    }
}

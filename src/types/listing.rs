//! Listing of the permit statements that can apply to a principal.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::decision::PermitPolicy;

/// The permit statements whose principal scope covers a given principal,
/// rendered for serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct PrincipalPolicies {
    pub principal: String,
    pub policies: Vec<PermitPolicy>,
}

impl PrincipalPolicies {
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

use sha2::{Digest, Sha256};

use crate::error::PolicyError;
use crate::parser::{Parser, PolicyStatement};
use crate::types::PolicyVersion;

/// Compile policy text into parsed statements.
///
/// Example:
/// ```rust
/// use canopy_core::compile_policy;
/// let statements = compile_policy(r#"
///     permit (principal, action, resource);
///     forbid  (principal == User::"evil", action, resource);
/// "#).unwrap();
/// assert_eq!(statements.len(), 2);
/// ```
pub fn compile_policy(text: &str) -> Result<Vec<PolicyStatement>, PolicyError> {
    Parser::new(text).parse()
}

/// Version metadata for a policy source: SHA-256 of the text plus the load
/// timestamp.
pub(crate) fn version_of(text: &str) -> PolicyVersion {
    PolicyVersion::new(format!("{:x}", Sha256::digest(text.as_bytes())))
}

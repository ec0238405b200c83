//! A Cedar-style authorization policy engine.
//!
//! Policy text parses into statements, condition clauses evaluate against
//! the request and an optional entity store, and statements combine
//! forbid-first into an allow/deny decision.
//!
//! Usage example:
//!
//! Here alice may read documents inside the `Folder::"root"` hierarchy, but
//! only over TLS, with sufficient clearance, and never for quarantined
//! documents:
//!
//! ```rust
//! use canopy_core::{Decision, PolicyEngine, Request};
//! use sha2::{Digest, Sha256};
//!
//! let policies = r#"
//! permit (
//!     principal == User::"alice",
//!     action in [ Action::"read", Action::"list" ],
//!     resource in Folder::"root"
//! ) when { context.tls == true && principal.clearance >= 3 }
//!   unless { resource.quarantined == true };
//! "#;
//!
//! let entities = r#"[
//!     { "uid": "User::\"alice\"", "attrs": { "clearance": 5 } },
//!     { "uid": "Folder::\"root\"" },
//!     { "uid": "Doc::\"readme\"",
//!       "parents": [ "Folder::\"root\"" ],
//!       "attrs": { "quarantined": false } }
//! ]"#;
//!
//! let engine = PolicyEngine::new_from_str(policies)
//!     .unwrap()
//!     .with_entities_from_str(entities)
//!     .unwrap();
//!
//! let request = Request::new("User::\"alice\"", "Action::\"read\"", "Doc::\"readme\"")
//!     .with_context(r#"{ "tls": true }"#);
//!
//! let decision = engine.evaluate(&request).unwrap();
//! assert!(matches!(decision, Decision::Allow { .. }));
//!
//! // Without TLS the when-clause fails and the request falls through to
//! // the implicit deny.
//! let plaintext = request.clone().with_context(r#"{ "tls": false }"#);
//! assert!(!engine.is_authorized(&plaintext).unwrap());
//!
//! // The engine reports the hash of the policy source it is running.
//! assert_eq!(
//!     engine.current_version().hash,
//!     format!("{:x}", Sha256::digest(policies))
//! );
//! ```
//!
//! ## Thread-safe sharing
//!
//! Everything is parsed up front and immutable afterwards, so wrap the
//! engine in `Arc` to share it across threads:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use canopy_core::{PolicyEngine, Request};
//!
//! let engine = Arc::new(
//!     PolicyEngine::new_from_str("permit (principal, action, resource);").unwrap(),
//! );
//! let worker = Arc::clone(&engine);
//!
//! let handle = thread::spawn(move || {
//!     let request = Request::new("User::\"u\"", "Action::\"read\"", "Doc::\"d\"");
//!     worker.is_authorized(&request).unwrap()
//! });
//! assert!(handle.join().unwrap());
//! ```

pub use engine::PolicyEngine;
pub use error::PolicyError;
pub use loader::compile_policy;
pub use parser::{
    ActionConstraint, ConditionClause, ConditionKind, Effect, PolicyStatement, ScopeConstraint,
};
pub use store::{Entity, EntityStore};
pub use token::{SequenceItem, Token};
pub use types::{
    AttrValue, Decision, PermitPolicy, PolicyVersion, PrincipalPolicies, Request,
};

mod engine;
mod error;
mod eval;
mod loader;
mod parser;
mod policy_match;
mod scanner;
mod store;
mod token;
pub mod types;

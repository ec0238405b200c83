//! The policy engine: eager policy/entity loading and the forbid-first
//! decision procedure.

use std::collections::BTreeMap;
use std::io::Read;

use tracing::{debug, info};

use crate::error::PolicyError;
use crate::eval::{self, EvalContext};
use crate::loader;
use crate::parser::{ConditionKind, Effect, PolicyStatement};
use crate::policy_match;
use crate::store::EntityStore;
use crate::types::{AttrValue, Decision, PermitPolicy, PolicyVersion, PrincipalPolicies, Request};

/// The main engine handle.
///
/// Policy text parses at construction and the entity store parses when
/// attached; after that every field is read-only, so an engine can be
/// shared across threads (wrap it in `Arc`) and cloned freely.
#[derive(Clone, Debug)]
pub struct PolicyEngine {
    statements: Vec<PolicyStatement>,
    store: Option<EntityStore>,
    allow_short_circuit: bool,
    version: PolicyVersion,
}

impl PolicyEngine {
    /// Parse policy text into an engine. Empty text is a valid, empty
    /// policy set that denies every request.
    pub fn new_from_str(policy_text: &str) -> Result<Self, PolicyError> {
        let statements = loader::compile_policy(policy_text)?;
        Ok(PolicyEngine {
            statements,
            store: None,
            allow_short_circuit: true,
            version: loader::version_of(policy_text),
        })
    }

    pub fn new_from_reader(mut reader: impl Read) -> Result<Self, PolicyError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::new_from_str(&text)
    }

    /// Attach (or replace) the entity store from its JSON form.
    pub fn set_entities_from_str(&mut self, json: &str) -> Result<(), PolicyError> {
        self.store = Some(EntityStore::from_str(json)?);
        Ok(())
    }

    pub fn set_entities_from_reader(&mut self, reader: impl Read) -> Result<(), PolicyError> {
        self.store = Some(EntityStore::from_reader(reader)?);
        Ok(())
    }

    pub fn with_entities_from_str(mut self, json: &str) -> Result<Self, PolicyError> {
        self.set_entities_from_str(json)?;
        Ok(self)
    }

    /// Control whether `&&`, `||`, and `if-then-else` suppress errors from
    /// operands that cannot affect the result. Defaults to enabled.
    pub fn set_allow_short_circuit(&mut self, allow: bool) {
        self.allow_short_circuit = allow;
    }

    pub fn with_short_circuit(mut self, allow: bool) -> Self {
        self.allow_short_circuit = allow;
        self
    }

    pub fn current_version(&self) -> PolicyVersion {
        self.version.clone()
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    pub fn entity_store(&self) -> Option<&EntityStore> {
        self.store.as_ref()
    }

    /// Decide a request: forbid statements first, then permits, implicit
    /// deny otherwise. Statements are visited in source order and any
    /// evaluation error aborts the decision.
    pub fn evaluate(&self, request: &Request) -> Result<Decision, PolicyError> {
        let context = parse_context(&request.context)?;

        debug!(
            event = "Request",
            phase = "Evaluation",
            principal = %request.principal,
            action = %request.action,
            resource = %request.resource,
        );

        for statement in self.statements.iter().filter(|s| s.effect == Effect::Forbid) {
            if self.statement_applies(statement, request, &context)? {
                debug!(
                    event = "Request",
                    phase = "Result",
                    decision = "deny",
                    policy = %statement,
                );
                return Ok(Decision::Deny {
                    version: self.version.clone(),
                });
            }
        }

        for statement in self.statements.iter().filter(|s| s.effect == Effect::Permit) {
            if self.statement_applies(statement, request, &context)? {
                info!(
                    event = "Request",
                    phase = "Policy",
                    decision = "allow",
                    policy = %statement,
                );
                return Ok(Decision::Allow {
                    policy: PermitPolicy {
                        literal: statement.to_string(),
                        json: statement.to_json(),
                    },
                    version: self.version.clone(),
                });
            }
        }

        debug!(event = "Request", phase = "Result", decision = "implicit deny");
        Ok(Decision::Deny {
            version: self.version.clone(),
        })
    }

    /// Boolean shorthand over [`PolicyEngine::evaluate`].
    pub fn is_authorized(&self, request: &Request) -> Result<bool, PolicyError> {
        Ok(self.evaluate(request)?.is_allow())
    }

    /// The permit statements whose principal scope covers `principal`.
    pub fn list_policies_for_principal(&self, principal: &str) -> PrincipalPolicies {
        let store = self.store.as_ref();
        let policies = self
            .statements
            .iter()
            .filter(|s| s.effect == Effect::Permit)
            .filter(|s| policy_match::scope_matches(&s.principal, principal, store))
            .map(|s| PermitPolicy {
                literal: s.to_string(),
                json: s.to_json(),
            })
            .collect();
        PrincipalPolicies {
            principal: principal.to_string(),
            policies,
        }
    }

    /// A statement applies when all three scopes match and every condition
    /// clause aligns with its kind (`when` true, `unless` false).
    fn statement_applies(
        &self,
        statement: &PolicyStatement,
        request: &Request,
        context: &BTreeMap<String, AttrValue>,
    ) -> Result<bool, PolicyError> {
        let store = self.store.as_ref();

        if !policy_match::scope_matches(&statement.principal, &request.principal, store) {
            return Ok(false);
        }
        if !policy_match::action_matches(&statement.action, &request.action, store)? {
            return Ok(false);
        }
        if !policy_match::scope_matches(&statement.resource, &request.resource, store) {
            return Ok(false);
        }

        for clause in &statement.conditions {
            let ctx = EvalContext {
                principal: &request.principal,
                action: &request.action,
                resource: &request.resource,
                context,
                store,
                allow_short_circuit: self.allow_short_circuit,
            };
            let satisfied = eval::eval_condition(&clause.sequence, &ctx)?;
            let aligned = match clause.kind {
                ConditionKind::When => satisfied,
                ConditionKind::Unless => !satisfied,
            };
            if !aligned {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Parse the request context: empty or blank text means an empty record,
/// anything else must be a JSON object with integer-only numbers.
fn parse_context(text: &str) -> Result<BTreeMap<String, AttrValue>, PolicyError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(trimmed)
        .map_err(|e| PolicyError::EvalError(format!("error parsing context: {e}")))
}

#[cfg(test)]
mod tests;

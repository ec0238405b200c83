//! Scope-constraint matching for the decision procedure.

use crate::error::PolicyError;
use crate::parser::{ActionConstraint, ScopeConstraint};
use crate::store::EntityStore;

/// Match a principal or resource constraint against a request slot.
/// Without an entity store, `in` collapses to structural equality.
pub(crate) fn scope_matches(
    constraint: &ScopeConstraint,
    value: &str,
    store: Option<&EntityStore>,
) -> bool {
    match constraint {
        ScopeConstraint::Any => true,
        ScopeConstraint::Eq(entity) => entity == value,
        ScopeConstraint::In(parent) => {
            parent == value
                || store
                    .map(|s| s.descendants(std::slice::from_ref(parent)).contains(value))
                    .unwrap_or(false)
        }
    }
}

/// Match an action constraint. `==` requires the entity to live in the
/// `Action::` namespace; the `in` form checks each store-expanded
/// descendant instead, so a structural match against a listed entity never
/// namespace-errors.
pub(crate) fn action_matches(
    constraint: &ActionConstraint,
    value: &str,
    store: Option<&EntityStore>,
) -> Result<bool, PolicyError> {
    match constraint {
        ActionConstraint::Any => Ok(true),
        ActionConstraint::Eq(entity) => {
            ensure_action_namespace(entity)?;
            Ok(entity == value)
        }
        ActionConstraint::In(parents) => {
            if parents.iter().any(|parent| parent == value) {
                return Ok(true);
            }
            match store {
                None => Ok(false),
                Some(s) => {
                    let descendants = s.descendants(parents);
                    for id in &descendants {
                        ensure_action_namespace(id)?;
                    }
                    Ok(descendants.contains(value))
                }
            }
        }
    }
}

fn ensure_action_namespace(entity: &str) -> Result<(), PolicyError> {
    if entity.starts_with("Action::\"") || entity.contains("::Action::\"") {
        Ok(())
    } else {
        Err(PolicyError::ScopeError(
            "actions in scope must use Action:: namespace".into(),
        ))
    }
}

use yare::parameterized;

use super::*;

#[test]
fn test_scope_equality_matches() {
    let policy = r#"
    permit (
        principal == Principal::"MyPrincipal",
        action == Action::"MyAction",
        resource == Resource::"MyResource"
    );"#;
    assert_eq!(decide_plain(policy), Ok(true));
}

#[parameterized(
    wrong_principal = { r#"permit (principal == Principal::"Other", action, resource);"# },
    wrong_action = { r#"permit (principal, action == Action::"other", resource);"# },
    wrong_resource = { r#"permit (principal, action, resource == Resource::"Other");"# },
)]
fn test_scope_equality_mismatch_denies(policy: &str) {
    assert_eq!(decide_plain(policy), Ok(false));
}

#[test]
fn test_action_equality_outside_action_namespace_errors() {
    let policy = r#"permit (principal, action == Namespace2::"Identifier2", resource);"#;
    let mut engine = engine_from_policy(policy);
    engine.set_allow_short_circuit(true);
    let request = Request::new(
        "Namespace::\"Identifier\"",
        "Namespace2::\"Identifier2\"",
        "Namespace3::\"Identifier3\"",
    );
    assert_eq!(
        engine.is_authorized(&request),
        Err(PolicyError::ScopeError(
            "actions in scope must use Action:: namespace".into()
        ))
    );
}

#[test]
fn test_action_in_list_matches_structurally_without_namespace_check() {
    let policy = r#"
    permit (
        principal,
        action in [ Namespace::"Identifier", Namespace2::"Identifier2" ],
        resource
    );"#;
    let engine = engine_from_policy(policy);
    let request = Request::new(
        "Principal::\"MyPrincipal\"",
        "Namespace2::\"Identifier2\"",
        "Resource::\"MyResource\"",
    );
    assert_eq!(engine.is_authorized(&request), Ok(true));
}

#[test]
fn test_action_in_single_entity_implied_list() {
    let policy = r#"permit (principal, action in Namespace::"Identifier", resource);"#;
    let engine = engine_from_policy(policy);
    let request = Request::new(
        "Principal::\"MyPrincipal\"",
        "Namespace::\"Identifier\"",
        "Resource::\"MyResource\"",
    );
    assert_eq!(engine.is_authorized(&request), Ok(true));
}

#[test]
fn test_in_scopes_without_store_deny_non_identical() {
    let policy = r#"
    permit (
        principal in Namespace::"Identifier",
        action in Namespace2::"Identifier2",
        resource in Namespace3::"Identifier3"
    );"#;
    assert_eq!(decide_plain(policy), Ok(false));
}

#[test]
fn test_in_scopes_match_self() {
    let policy = r#"
    permit (
        principal in Namespace::"Identifier",
        action in Namespace2::"Identifier2",
        resource in Namespace3::"Identifier3"
    );"#;
    let engine = engine_from_policy(policy);
    let request = Request::new(
        "Namespace::\"Identifier\"",
        "Namespace2::\"Identifier2\"",
        "Namespace3::\"Identifier3\"",
    );
    assert_eq!(engine.is_authorized(&request), Ok(true));
}

#[test]
fn test_in_scopes_with_store_walk_parents() {
    let policy = r#"
    permit (
        principal in Principal::"Parent",
        action in Action::"Parent",
        resource in Resource::"Parent"
    );"#;
    assert_eq!(decide(policy, Some(TEST_ENTITIES), None, true), Ok(true));
}

#[test]
fn test_in_scope_with_bracketed_action_list_and_store() {
    let policy = r#"
    permit (
        principal in Principal::"Parent",
        action in [ Action::"Parent" ],
        resource in Resource::"Parent"
    );"#;
    assert_eq!(decide(policy, Some(TEST_ENTITIES), None, true), Ok(true));
}

#[test]
fn test_in_scopes_with_store_walk_grandparents() {
    let policy = r#"
    permit (
        principal in Principal::"Grandparent",
        action in Action::"Grandparent",
        resource in Resource::"Grandparent"
    );"#;
    assert_eq!(decide(policy, Some(TEST_ENTITIES), None, true), Ok(true));
}

#[test]
fn test_in_scope_is_not_symmetric() {
    // The request slots are the parents here, so nothing descends.
    let policy = r#"
    permit (
        principal in Principal::"MyPrincipal",
        action in Action::"MyAction",
        resource in Resource::"MyResource"
    );"#;
    let mut engine = engine_from_policy(policy);
    engine.set_entities_from_str(TEST_ENTITIES).unwrap();
    let request = Request::new(
        "Principal::\"Parent\"",
        "Action::\"Parent\"",
        "Resource::\"Parent\"",
    );
    assert_eq!(engine.is_authorized(&request), Ok(false));
}

#[test]
fn test_forbid_scope_matching_follows_hierarchy() {
    let policy = r#"
    permit (principal, action, resource);
    forbid (principal in Principal::"Grandparent", action, resource);
    "#;
    assert_eq!(decide(policy, Some(TEST_ENTITIES), None, true), Ok(false));
}

use sha2::{Digest, Sha256};
use yare::parameterized;

use super::*;

const TEST_POLICY: &str = r#"
permit (
    principal == Principal::"MyPrincipal",
    action == Action::"MyAction",
    resource == Resource::"MyResource"
);
"#;

#[test]
fn test_empty_policy_denies_without_error() {
    assert_eq!(decide_plain(""), Ok(false));
}

#[test]
fn test_whitespace_only_policy_loads() {
    assert_eq!(decide_plain("   \n\t  \n  "), Ok(false));
}

#[test]
fn test_bare_permit_grants() {
    assert_eq!(decide_plain("permit (principal, action, resource);"), Ok(true));
}

#[test]
fn test_bare_forbid_denies() {
    assert_eq!(decide_plain("forbid (principal, action, resource);"), Ok(false));
}

#[parameterized(
    forbid_after_permit = { "permit (principal, action, resource); forbid (principal, action, resource);" },
    forbid_before_permit = { "forbid (principal, action, resource); permit (principal, action, resource);" },
)]
fn test_matching_forbid_overrides_permit(policy: &str) {
    assert_eq!(decide_plain(policy), Ok(false));
}

#[test]
fn test_comments_are_ignored() {
    let policy = r#"
    // comment stuff
    permit (
        // comment stuff
        principal, // comment stuff
        action,
        resource // comment stuff
    ); // comment stuff"#;
    assert_eq!(decide_plain(policy), Ok(true));
}

#[test]
fn test_non_matching_forbid_leaves_permit_in_force() {
    let policy = r#"
    permit (principal, action, resource);
    forbid (principal == Principal::"SomeoneElse", action, resource);
    "#;
    assert_eq!(decide_plain(policy), Ok(true));
}

#[test]
fn test_forbid_with_unsatisfied_condition_is_skipped() {
    let policy = r#"
    permit (principal, action, resource);
    forbid (principal, action, resource) when { 1 == 2 };
    forbid (principal, action, resource) unless { true };
    "#;
    assert_eq!(decide_plain(policy), Ok(true));
}

#[test]
fn test_parse_error_on_garbage() {
    let err = PolicyEngine::new_from_str("foo").unwrap_err();
    assert_eq!(
        err,
        PolicyError::ParseError("found \"foo\", expected permit or forbid".into())
    );
}

#[test]
fn test_parse_error_on_truncated_statement() {
    let result = PolicyEngine::new_from_str(
        r#"
        permit (
            principal == User::"alice"
        "#,
    );
    assert!(matches!(result, Err(PolicyError::ParseError(_))));
}

#[test]
fn test_new_from_reader() {
    let engine =
        PolicyEngine::new_from_reader("permit (principal, action, resource);".as_bytes())
            .expect("reader policy should load");
    assert_eq!(engine.statements().len(), 1);
}

#[test]
fn test_current_version_hash() {
    let engine = engine_from_policy(TEST_POLICY);
    let expected = format!("{:x}", Sha256::digest(TEST_POLICY.as_bytes()));
    assert_eq!(engine.current_version().hash, expected);
}

#[test]
fn test_decision_carries_version() {
    let engine = engine_from_policy(TEST_POLICY);
    let decision = engine.evaluate(&test_request()).unwrap();
    assert_eq!(decision.version().hash, engine.current_version().hash);
}

#[test]
fn test_allow_carries_permitting_policy() {
    let engine = engine_from_policy(TEST_POLICY);
    let decision = engine.evaluate(&test_request()).unwrap();
    match decision {
        Decision::Allow { policy, .. } => {
            assert!(policy.literal.starts_with("permit (principal == Principal::\"MyPrincipal\""));
            assert_eq!(policy.json["effect"], "permit");
            assert_eq!(policy.json["action"]["entity"], "Action::\"MyAction\"");
        }
        Decision::Deny { .. } => panic!("expected allow"),
    }
}

#[test]
fn test_first_matching_permit_wins() {
    let policy = r#"
    permit (principal, action, resource) when { 1 == 2 };
    permit (principal == Principal::"MyPrincipal", action, resource);
    permit (principal, action, resource);
    "#;
    let engine = engine_from_policy(policy);
    match engine.evaluate(&test_request()).unwrap() {
        Decision::Allow { policy, .. } => {
            assert!(policy.literal.contains("Principal::\"MyPrincipal\""));
        }
        Decision::Deny { .. } => panic!("expected allow"),
    }
}

#[test]
fn test_statement_error_aborts_evaluation() {
    // The forbid statement's condition errors before any permit is tried.
    let policy = r#"
    forbid (principal, action, resource) when { principal.missing == 1 };
    permit (principal, action, resource);
    "#;
    assert!(matches!(decide_plain(policy), Err(PolicyError::EvalError(_))));
}

#[test]
fn test_invalid_context_errors() {
    let policy = "permit (principal, action, resource);";
    let result = decide(policy, None, Some("[1, 2]"), true);
    assert!(matches!(result, Err(PolicyError::EvalError(_))));
}

#[test]
fn test_empty_context_is_empty_record() {
    // Blank context text parses as an empty record, so the access fails
    // with a missing attribute rather than a context parse error.
    let probe = when_policy("context.s == \"abc\"");
    let result = decide(&probe, None, Some("   "), true);
    assert_eq!(
        result,
        Err(PolicyError::EvalError("attribute not set".into()))
    );
}

#[test]
fn test_concurrent_evaluation() {
    use std::sync::Arc;
    use std::thread;

    let engine = Arc::new(engine_from_policy(TEST_POLICY));
    let mut handles = vec![];

    for _ in 0..10 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                let decision = engine.evaluate(&test_request());
                assert!(decision.is_ok());
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_list_policies_for_principal() {
    let policy = r#"
    permit (principal == Principal::"MyPrincipal", action == Action::"read", resource);
    permit (principal == Principal::"Other", action, resource);
    permit (principal, action, resource);
    forbid (principal == Principal::"MyPrincipal", action, resource);
    "#;
    let engine = engine_from_policy(policy);
    let listing = engine.list_policies_for_principal("Principal::\"MyPrincipal\"");
    // The targeted permit and the any-principal permit; the forbid and the
    // other principal's permit are excluded.
    assert_eq!(listing.len(), 2);
    assert_eq!(listing.principal, "Principal::\"MyPrincipal\"");
    assert!(listing.policies[0].literal.contains("Action::\"read\""));
}

#[test]
fn test_list_policies_follows_group_membership() {
    let policy = r#"permit (principal in Principal::"Parent", action, resource);"#;
    let mut engine = engine_from_policy(policy);
    engine.set_entities_from_str(TEST_ENTITIES).unwrap();
    let listing = engine.list_policies_for_principal("Principal::\"MyPrincipal\"");
    assert_eq!(listing.len(), 1);
    let listing = engine.list_policies_for_principal("Principal::\"Unrelated\"");
    assert!(listing.is_empty());
}

#[test]
fn test_statement_display_round_trips() {
    let policy = r#"
    permit (principal == User::"alice", action in [Action::"read", Action::"list"], resource in Folder::"root") when { context.tls == true };
    forbid (principal, action, resource) unless { principal in Group::"trusted" };
    "#;
    let engine = engine_from_policy(policy);
    let rendered: Vec<String> = engine.statements().iter().map(|s| s.to_string()).collect();
    let reparsed = crate::compile_policy(&rendered.join("\n")).expect("rendered policy reparses");
    assert_eq!(engine.statements(), &reparsed[..]);
}

use super::*;
use crate::error::PolicyError;

mod core;
mod extensions;
mod scopes;

/// Entity store shared by the scope and attribute scenarios: a three-level
/// principal/action/resource hierarchy plus attribute-bearing entities.
const TEST_ENTITIES: &str = r#"
[
    {
        "uid": "Principal::\"MyPrincipal\"",
        "parents": ["Principal::\"Parent\""],
        "attrs": {
            "s": "abc",
            "i": 123,
            "b": true,
            "r": {"s": "abc", "i": 123, "b": true, "l": ["def"]},
            "l": ["def"]
        }
    },
    {"uid": "Action::\"MyAction\"", "parents": ["Action::\"Parent\""]},
    {"uid": "Resource::\"MyResource\"", "parents": ["Resource::\"Parent\""]},
    {"uid": "Principal::\"Parent\"", "parents": ["Principal::\"Grandparent\""]},
    {"uid": "Action::\"Parent\"", "parents": ["Action::\"Grandparent\""]},
    {"uid": "Resource::\"Parent\"", "parents": ["Resource::\"Grandparent\""]},
    {"uid": "Principal::\"Grandparent\""},
    {"uid": "Action::\"Grandparent\""},
    {"uid": "Resource::\"Grandparent\""}
]"#;

const TEST_CONTEXT: &str = r#"
{
    "s": "abc",
    "i": 123,
    "b": true,
    "r": {"s": "abc", "i": 123, "b": true, "l": ["def"]},
    "l": ["def"]
}"#;

fn engine_from_policy(policy_text: &str) -> PolicyEngine {
    PolicyEngine::new_from_str(policy_text).expect("policy should load")
}

fn test_request() -> Request {
    Request::new(
        "Principal::\"MyPrincipal\"",
        "Action::\"MyAction\"",
        "Resource::\"MyResource\"",
    )
}

/// Decide the standard request against `policy_text`, with optional entity
/// store, context, and short-circuit override.
fn decide(
    policy_text: &str,
    entities: Option<&str>,
    context: Option<&str>,
    allow_short_circuit: bool,
) -> Result<bool, PolicyError> {
    let mut engine = engine_from_policy(policy_text);
    if let Some(json) = entities {
        engine.set_entities_from_str(json).expect("entities should load");
    }
    engine.set_allow_short_circuit(allow_short_circuit);
    let mut request = test_request();
    if let Some(ctx) = context {
        request = request.with_context(ctx);
    }
    engine.is_authorized(&request)
}

fn decide_plain(policy_text: &str) -> Result<bool, PolicyError> {
    decide(policy_text, None, None, true)
}

/// Wrap a condition body into a bare permit statement.
fn when_policy(body: &str) -> String {
    format!("permit (principal, action, resource) when {{ {body} }};")
}

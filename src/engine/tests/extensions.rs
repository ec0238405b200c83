use yare::parameterized;

use super::*;

#[parameterized(
    ip_equality = { "ip(\"10.0.0.1\") == ip(\"10.0.0.1\")", true },
    ip_equality_negative = { "ip(\"10.0.0.1\") == ip(\"10.0.0.2\")", false },
    ip_cidr_normalization = { "ip(\"10.0.0.5/24\") == ip(\"10.0.0.0/24\")", true },
    ip_in_range = { "ip(\"10.0.0.5/24\").isInRange(ip(\"10.0.2.7/8\"))", true },
    ip_not_in_range = { "ip(\"11.0.0.5/24\").isInRange(ip(\"10.0.0.0/8\"))", false },
    ip_classification = { "ip(\"10.0.0.1\").isIpv4() && ip(\"2001:0db8:85a3::8a2e:0370:7334\").isIpv6() && ip(\"127.0.0.1\").isLoopback() && ip(\"224.0.0.1\").isMulticast()", true },
    ip_loopback_negative = { "ip(\"8.8.8.8\").isLoopback()", false },
    ip_mixed_type_equality = { "ip(\"10.0.0.1\") == 123", false },
    decimal_equality = { "decimal(\"12.34\") == decimal(\"12.340\")", true },
    decimal_equality_negative = { "decimal(\"12.34\") == decimal(\"12.341\")", false },
    decimal_comparisons = { "decimal(\"12.34\").lessThan(decimal(\"20\")) && decimal(\"12.34\").lessThanOrEqual(decimal(\"12.34\")) && decimal(\"12.34\").greaterThan(decimal(\"10\")) && decimal(\"12.34\").greaterThanOrEqual(decimal(\"12.34\"))", true },
    set_contains = { "[1, 2, 3].contains(2)", true },
    set_contains_negative = { "[1, 2, 3].contains(5)", false },
    set_contains_all = { "[1, 2, 3].containsAll([1, 2])", true },
    set_contains_all_negative = { "[1, 2].containsAll([1, 2, 3])", false },
    set_contains_any = { "[1, 2, 3].containsAny([5, 4, 3])", true },
    set_contains_any_negative = { "[1, 2, 3].containsAny([6, 5, 4])", false },
    set_of_strings = { "[\"a\", \"b\"].contains(\"b\")", true },
    record_literal_access = { "{\"xyz\": true}.xyz", true },
    record_literal_multiple_keys = { "{\"a\": 1, \"b\": 2}.b == 2", true },
)]
fn test_extension_conditions(body: &str, expected: bool) {
    assert_eq!(decide_plain(&when_policy(body)), Ok(expected), "body: {body}");
}

#[test]
fn test_invalid_ip_errors() {
    assert_eq!(
        decide_plain(&when_policy("ip(\"garbage\").isIpv4()")),
        Err(PolicyError::EvalError("invalid ip".into()))
    );
}

#[test]
fn test_decimal_precision_error() {
    assert_eq!(
        decide_plain(&when_policy("decimal(\"12.12345\") == decimal(\"0\")")),
        Err(PolicyError::EvalError("too much precision in decimal".into()))
    );
}

#[test]
fn test_invalid_ip_suppressed_by_short_circuit() {
    assert_eq!(
        decide_plain(&when_policy("true || ip(\"garbage\").isIpv4()")),
        Ok(true)
    );
}

#[test]
fn test_like_complexity_bound_is_enforced() {
    let text = "a".repeat(2_000);
    let pattern = format!("*{}b", "a".repeat(500));
    let body = format!("\"{text}\" like \"{pattern}\"");
    assert_eq!(
        decide_plain(&when_policy(&body)),
        Err(PolicyError::EvalError("string match too complex".into()))
    );
}

#[test]
fn test_record_from_context_equality() {
    // Records compare structurally regardless of key order in the source.
    let body = "context.r == {\"s\": \"abc\", \"i\": 123, \"b\": true, \"l\": [\"def\"]}";
    assert_eq!(
        decide(&when_policy(body), None, Some(TEST_CONTEXT), true),
        Ok(true)
    );
}

#[test]
fn test_set_from_attribute_equality_with_literal() {
    let body = "principal.l == [\"def\"]";
    assert_eq!(
        decide(&when_policy(body), Some(TEST_ENTITIES), None, true),
        Ok(true)
    );
}

#[test]
fn test_typed_set_membership_does_not_conflate() {
    assert_eq!(decide_plain(&when_policy("[1, 2, 3].contains(\"2\")")), Ok(false));
}

//! Extension-function dispatch: the free constructors `ip(…)` and
//! `decimal(…)`, and the method calls reachable through `.`.

use super::decimal::Decimal;
use super::ipaddr::IpRange;
use super::value::Value;
use super::wildcard;

/// Number of arguments a known method takes (receiver excluded), or `None`
/// for an unknown method name.
pub(crate) fn method_arity(name: &str) -> Option<usize> {
    match name {
        "isIpv4" | "isIpv6" | "isLoopback" | "isMulticast" => Some(0),
        "isInRange" | "lessThan" | "lessThanOrEqual" | "greaterThan" | "greaterThanOrEqual"
        | "contains" | "containsAll" | "containsAny" => Some(1),
        _ => None,
    }
}

/// Apply a free constructor. `ip` parses an address or CIDR block into a
/// normalized range; `decimal` parses fixed-point text.
pub(crate) fn call_constructor(name: &str, arg: Value) -> Value {
    if let Value::Error(e) = arg {
        return Value::Error(e);
    }
    match name {
        "ip" => match arg {
            Value::Str(s) => match IpRange::parse(&s) {
                Ok(range) => Value::Ip(range),
                Err(e) => Value::Error(e),
            },
            other => Value::Error(format!("ip() expects a string, got {}", other.type_name())),
        },
        "decimal" => match arg {
            Value::Str(s) => match Decimal::parse(&s) {
                Ok(d) => Value::Decimal(d),
                Err(e) => Value::Error(e),
            },
            other => Value::Error(format!(
                "decimal() expects a string, got {}",
                other.type_name()
            )),
        },
        _ => Value::Error(format!("unknown function: {name}")),
    }
}

/// Apply a method to its receiver. The argument, if any, was the value on
/// top of the stack; the receiver sat below it.
pub(crate) fn apply_method(name: &str, receiver: Value, arg: Option<Value>) -> Value {
    if let Value::Error(e) = receiver {
        return match arg {
            Some(Value::Error(e2)) => Value::Error(format!("{e}; {e2}")),
            _ => Value::Error(e),
        };
    }
    if let Some(Value::Error(e)) = arg {
        return Value::Error(e);
    }

    match (&receiver, name) {
        (Value::Ip(range), "isIpv4") => Value::Bool(range.is_ipv4()),
        (Value::Ip(range), "isIpv6") => Value::Bool(range.is_ipv6()),
        (Value::Ip(range), "isLoopback") => Value::Bool(range.is_loopback()),
        (Value::Ip(range), "isMulticast") => Value::Bool(range.is_multicast()),
        (Value::Ip(range), "isInRange") => match arg {
            Some(Value::Ip(other)) => Value::Bool(other.contains_range(range)),
            _ => Value::Error("isInRange expects an ip argument".into()),
        },
        (Value::Decimal(d), "lessThan")
        | (Value::Decimal(d), "lessThanOrEqual")
        | (Value::Decimal(d), "greaterThan")
        | (Value::Decimal(d), "greaterThanOrEqual") => match arg {
            Some(Value::Decimal(other)) => Value::Bool(match name {
                "lessThan" => *d < other,
                "lessThanOrEqual" => *d <= other,
                "greaterThan" => *d > other,
                _ => *d >= other,
            }),
            _ => Value::Error(format!("{name} expects a decimal argument")),
        },
        (Value::Set(items), "contains") => match arg {
            Some(needle) => Value::Bool(items.contains(&needle)),
            None => Value::Error("contains expects an argument".into()),
        },
        (Value::Set(items), "containsAll") => match arg {
            Some(Value::Set(others)) => {
                Value::Bool(others.iter().all(|v| items.contains(v)))
            }
            _ => Value::Error("unexpected use of containsAll function".into()),
        },
        (Value::Set(items), "containsAny") => match arg {
            Some(Value::Set(others)) => {
                Value::Bool(others.iter().any(|v| items.contains(v)))
            }
            _ => Value::Error("unexpected use of containsAny function".into()),
        },
        (Value::Set(_), _) | (Value::Ip(_), _) | (Value::Decimal(_), _) => {
            Value::Error(format!("unknown method {name} for {}", receiver.type_name()))
        }
        _ => Value::Error(format!(
            "unexpected use of {name} function on {}",
            receiver.type_name()
        )),
    }
}

/// `lhs like pattern` with the bounded glob matcher.
pub(crate) fn like(lhs: Value, rhs: Value) -> Value {
    match (lhs, rhs) {
        (Value::Error(a), Value::Error(b)) => Value::Error(format!("{a}; {b}")),
        (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e),
        (Value::Str(s), Value::Str(p)) => match wildcard::match_wildcard(&s, &p) {
            Ok(matched) => Value::Bool(matched),
            Err(_) => Value::Error("string match too complex".into()),
        },
        (Value::Str(_), _) => Value::Bool(false),
        (other, _) => Value::Error(format!(
            "like requires a string left operand, got {}",
            other.type_name()
        )),
    }
}

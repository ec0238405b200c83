//! The runtime value domain of the condition evaluator.

use std::collections::BTreeMap;

use crate::types::AttrValue;

use super::decimal::Decimal;
use super::ipaddr::IpRange;

/// A value produced while reducing a condition clause.
///
/// The domain is closed: the operator table dispatches over exactly these
/// variants. `Error` carries a suppressible evaluation failure; it flows
/// through the stack like any other value so short-circuiting operators can
/// discard it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Bool(bool),
    Long(i64),
    Str(String),
    Entity(String),
    Set(Vec<Value>),
    Record(BTreeMap<String, Value>),
    Ip(IpRange),
    Decimal(Decimal),
    Error(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Long(_) => "long",
            Value::Str(_) => "string",
            Value::Entity(_) => "entity",
            Value::Set(_) => "set",
            Value::Record(_) => "record",
            Value::Ip(_) => "ip",
            Value::Decimal(_) => "decimal",
            Value::Error(_) => "error",
        }
    }

    pub fn from_attr(attr: &AttrValue) -> Value {
        match attr {
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Long(n) => Value::Long(*n),
            AttrValue::String(s) => Value::Str(s.clone()),
            AttrValue::Set(items) => Value::Set(items.iter().map(Value::from_attr).collect()),
            AttrValue::Record(map) => Value::Record(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_attr(v)))
                    .collect(),
            ),
        }
    }

    pub fn from_attr_map(attrs: &BTreeMap<String, AttrValue>) -> BTreeMap<String, Value> {
        attrs
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_attr(v)))
            .collect()
    }
}

/// The outcome of one branch of an `if-then-else`, preserved inside the
/// composites so the `if` reducer can decide whether an error in the
/// unchosen branch is suppressed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Branch {
    Bool(bool),
    Error(String),
}

/// One element of the reduction stack: a value, a pending attribute or
/// function name, a collection delimiter, or an `if-then-else` composite.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StackItem {
    Value(Value),
    AttrName(String),
    Func(String),
    SetOpen,
    RecordOpen,
    Colon,
    Else(Branch),
    ThenElse { then: Branch, other: Branch },
}

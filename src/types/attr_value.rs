//! Typed attribute values for entities and request context.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An attribute value attached to an entity or supplied in the request
/// context. Maps directly onto the JSON value space of the entity store:
/// booleans, 64-bit integers, strings, arrays, and nested objects.
///
/// Non-integer numbers are rejected at deserialization time; an
/// authorization decision never silently truncates.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Long(i64),
    String(String),
    #[schema(no_recursion)]
    Set(Vec<AttrValue>),
    #[schema(no_recursion)]
    Record(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Bool(_) => "bool",
            AttrValue::Long(_) => "long",
            AttrValue::String(_) => "string",
            AttrValue::Set(_) => "set",
            AttrValue::Record(_) => "record",
        }
    }
}

//! Authorization request type.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The request tuple: canonical entity references for principal, action,
/// and resource, plus the context as JSON object text (empty means `{}`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub struct Request {
    pub principal: String,
    pub action: String,
    pub resource: String,
    #[serde(default)]
    pub context: String,
}

impl Request {
    pub fn new(
        principal: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Request {
            principal: principal.into(),
            action: action.into(),
            resource: resource.into(),
            context: String::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_to_empty_context() {
        let request = Request::new("User::\"alice\"", "Action::\"read\"", "Doc::\"a\"");
        assert_eq!(request.context, "");
        let request = request.with_context(r#"{"tls": true}"#);
        assert_eq!(request.context, r#"{"tls": true}"#);
    }

    #[test]
    fn test_serialization_round_trip() {
        let request = Request::new("User::\"alice\"", "Action::\"read\"", "Doc::\"a\"")
            .with_context("{}");
        let json = serde_json::to_value(&request).unwrap();
        let back: Request = serde_json::from_value(json).unwrap();
        assert_eq!(request, back);
    }

    #[test]
    fn test_deserialization_defaults_context() {
        let request: Request = serde_json::from_str(
            r#"{"principal": "U::\"a\"", "action": "Action::\"x\"", "resource": "R::\"r\""}"#,
        )
        .unwrap();
        assert_eq!(request.context, "");
    }
}

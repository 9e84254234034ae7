//! Validated caller identity.
//!
//! An [`Identity`] is built from the claims of a verified token: the subject
//! plus every other claim, passed through as opaque authorization attributes.
//! The subject is redacted in Debug output to keep user identifiers out of
//! logs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Decoded, verified claims about the caller.
///
/// Owned by exactly one request's extensions and dropped with the request.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Subject identifier (`sub` claim) - redacted in Debug output.
    #[serde(rename = "sub")]
    pub subject: String,

    /// Every other claim, unvalidated (role flags, `exp`, `iat`, ...).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attribute_names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        f.debug_struct("Identity")
            .field("subject", &"[REDACTED]")
            .field("attributes", &attribute_names)
            .finish()
    }
}

impl Identity {
    /// Create an identity with no attributes.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            attributes: Map::new(),
        }
    }

    /// Builder-style helper to add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Raw attribute value, if present.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// True only when the attribute is the JSON boolean `true`.
    ///
    /// Strings such as `"true"` and numbers such as `1` do not count.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.attributes.get(name), Some(Value::Bool(true)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_debug_redacts_subject() {
        let identity = Identity::new("secret-user-id").with_attribute("isAdmin", true);

        let debug_str = format!("{identity:?}");

        assert!(!debug_str.contains("secret-user-id"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("isAdmin"));
    }

    #[test]
    fn test_deserialize_passes_unknown_claims_through() {
        let claims = json!({
            "sub": "user-42",
            "isAdmin": true,
            "exp": 1_600_000_000,
            "nested": {"tenant": "acme"}
        });

        let identity: Identity = serde_json::from_value(claims).unwrap();

        assert_eq!(identity.subject, "user-42");
        assert!(identity.flag("isAdmin"));
        assert_eq!(identity.attribute("exp"), Some(&json!(1_600_000_000)));
        assert_eq!(identity.attribute("nested"), Some(&json!({"tenant": "acme"})));
        assert!(identity.attribute("sub").is_none());
    }

    #[test]
    fn test_deserialize_requires_subject() {
        let result: Result<Identity, _> = serde_json::from_value(json!({"isAdmin": true}));
        assert!(result.is_err());

        let result: Result<Identity, _> = serde_json::from_value(json!({"sub": 42}));
        assert!(result.is_err());
    }

    #[test]
    fn test_flag_requires_boolean_true() {
        let identity = Identity::new("user")
            .with_attribute("a", true)
            .with_attribute("b", false)
            .with_attribute("c", "true")
            .with_attribute("d", 1);

        assert!(identity.flag("a"));
        assert!(!identity.flag("b"));
        assert!(!identity.flag("c"));
        assert!(!identity.flag("d"));
        assert!(!identity.flag("missing"));
    }

    #[test]
    fn test_serialize_round_trips_subject_name() {
        let identity = Identity::new("user-1").with_attribute("canWritePosts", true);
        let json = serde_json::to_value(&identity).unwrap();

        assert_eq!(json["sub"], "user-1");
        assert_eq!(json["canWritePosts"], true);
    }
}

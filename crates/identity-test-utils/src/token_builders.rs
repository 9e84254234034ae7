//! Builder patterns for test claims
//!
//! Provides a fluent API for creating token claims.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Builder for creating test token claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("alice")
///     .admin()
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    sub: Option<String>,
    exp: i64,
    iat: i64,
    attributes: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new claims builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: Some("test-subject".to_string()),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            attributes: Map::new(),
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    /// Omit the `sub` claim entirely
    pub fn without_subject(mut self) -> Self {
        self.sub = None;
        self
    }

    /// Add an arbitrary claim
    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Shorthand for `isAdmin: true`
    pub fn admin(self) -> Self {
        self.with_attribute("isAdmin", true)
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Expired an hour ago
    pub fn expired(self) -> Self {
        self.expires_in(-3600)
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = self.attributes;
        if let Some(sub) = self.sub {
            claims.insert("sub".to_string(), json!(sub));
        }
        claims.insert("exp".to_string(), json!(self.exp));
        claims.insert("iat".to_string(), json!(self.iat));
        Value::Object(claims)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

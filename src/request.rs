use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Tainted;

/// Identity of the caller for the current request.
///
/// Built once per request by the identity collaborator (the authentication
/// layer in front of this crate) and read-only afterwards. The `user_id` is the
/// tenant/user discriminator; `properties` carry extra claims such as a tenant
/// name or a region filter.
///
/// Values read for query binding leave the context as [`Tainted`] and must be
/// sanitized before they reach a query.
///
/// # Examples
///
/// ```
/// use datasource_router::UserContext;
///
/// let ctx = UserContext::new("42").with_property("tenant", "acme");
///
/// assert_eq!(ctx.user_id(), "42");
/// assert_eq!(ctx.property("tenant").and_then(|v| v.as_str()), Some("acme"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    user_id: String,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

impl UserContext {
    /// Creates a context with no extra claims.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            properties: HashMap::new(),
        }
    }

    /// Adds a claim, replacing any previous value under the same name.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Returns the user id.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns a claim by name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Returns all claims.
    pub fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }

    /// The user id as an untrusted value for parameter binding.
    pub(crate) fn tainted_user_id(&self) -> Tainted<Value> {
        Tainted::new(Value::String(self.user_id.clone()))
    }

    /// A claim as an untrusted value for parameter binding.
    pub(crate) fn tainted_property(&self, name: &str) -> Option<Tainted<Value>> {
        self.properties.get(name).cloned().map(Tainted::new)
    }
}

//! Query keys.
//!
//! A key is an ordered list of parts, starting with the resource that owns
//! it. Parameter parts are canonical maps, so two filters with the same
//! logical values always produce equal keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Backend resource owning a family of keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Accounts,
    Contacts,
    Notes,
    Organizations,
    Permissions,
    Surveys,
}

impl Resource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Resource::Accounts => "accounts",
            Resource::Contacts => "contacts",
            Resource::Notes => "notes",
            Resource::Organizations => "organizations",
            Resource::Permissions => "permissions",
            Resource::Surveys => "surveys",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPart {
    /// Operation name or entity identifier.
    Name(String),
    /// Canonical parameter map; unset parameters are omitted.
    Params(BTreeMap<String, String>),
}

impl KeyPart {
    /// Canonicalizes any serializable filter into a parameter part.
    ///
    /// Null fields are dropped and scalars are rendered as text, so field
    /// order and `None` versus absent never produce distinct keys.
    pub fn params<T: Serialize + ?Sized>(value: &T) -> Self {
        let mut params = BTreeMap::new();
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => {
                for (name, value) in map {
                    match value {
                        Value::Null => {}
                        Value::String(s) => {
                            params.insert(name, s);
                        }
                        other => {
                            params.insert(name, other.to_string());
                        }
                    }
                }
            }
            Ok(Value::Null) => {}
            Ok(other) => {
                params.insert("value".to_string(), other.to_string());
            }
            Err(e) => {
                let filter = std::any::type_name::<T>();
                tracing::warn!(error = %e, filter, "query parameters could not be serialized");
                params.insert("error".to_string(), e.to_string());
                params.insert("filter".to_string(), filter.to_string());
            }
        }
        KeyPart::Params(params)
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Name(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Name(s)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Name(name) => f.write_str(name),
            KeyPart::Params(params) => {
                let rendered: Vec<String> =
                    params.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", rendered.join(","))
            }
        }
    }
}

/// Deterministic identifier of a cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    /// Root key of a resource.
    pub fn root(resource: Resource) -> Self {
        Self(vec![KeyPart::Name(resource.as_str().to_string())])
    }

    /// Returns this key extended by one part.
    #[must_use]
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `prefix` is a (non-strict) prefix of this key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl From<KeyPart> for QueryKey {
    fn from(part: KeyPart) -> Self {
        Self(vec![part])
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join("/"))
    }
}

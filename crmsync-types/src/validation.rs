//! Field-level validation errors returned by the backend (HTTP 422).
//!
//! Two body shapes are understood:
//!
//! ```text
//! {"detail": [{"loc": ["body", "email"], "msg": "invalid email"}]}
//! {"errors": {"email": ["invalid email"]}, "message": "..."}
//! ```
//!
//! Anything else is kept as a single message so nothing is lost.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Location prefixes that name the request part rather than the field.
const LOCATION_PREFIXES: &[&str] = &["body", "query", "path"];

/// Structured validation failure, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    /// Message not tied to a single field.
    pub message: Option<String>,
    /// Messages per field, in backend order.
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Parses a backend error body.
    pub fn from_body(body: &Value) -> Self {
        let mut errors = Self::default();

        match body.get("detail") {
            Some(Value::Array(items)) => {
                for item in items {
                    let field = item
                        .get("loc")
                        .and_then(Value::as_array)
                        .map(|loc| field_path(loc))
                        .unwrap_or_default();
                    let msg = item
                        .get("msg")
                        .and_then(Value::as_str)
                        .unwrap_or("invalid value")
                        .to_string();
                    errors.push(field, msg);
                }
            }
            Some(Value::String(detail)) => errors.message = Some(detail.clone()),
            _ => {}
        }

        if let Some(Value::Object(map)) = body.get("errors") {
            for (field, value) in map {
                match value {
                    Value::Array(msgs) => {
                        for msg in msgs {
                            errors.push(field.clone(), value_text(msg));
                        }
                    }
                    other => errors.push(field.clone(), value_text(other)),
                }
            }
        }

        if errors.message.is_none() {
            errors.message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
        }

        errors
    }

    /// Adds a message for `field`. An empty field name is treated as a general message.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        if field.is_empty() {
            self.message.get_or_insert(message);
        } else {
            self.fields.entry(field).or_default().push(message);
        }
    }

    /// Messages recorded for `field`.
    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.fields.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(msg) = &self.message {
            parts.push(msg.clone());
        }
        for (field, msgs) in &self.fields {
            parts.push(format!("{field}: {}", msgs.join(", ")));
        }
        if parts.is_empty() {
            f.write_str("invalid request")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}

fn field_path(loc: &[Value]) -> String {
    let mut segments: Vec<String> = loc.iter().map(value_text).collect();
    if segments
        .first()
        .is_some_and(|s| LOCATION_PREFIXES.contains(&s.as_str()))
    {
        segments.remove(0);
    }
    segments.join(".")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

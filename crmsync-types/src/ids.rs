//! Identifier types for backend-owned entities.
//!
//! The backend issues identifiers; the client treats them as opaque strings.
//! An identifier that is empty or whitespace-only is "blank" and must never
//! reach the network.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! backend_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a backend-issued identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is empty or whitespace-only.
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

backend_id!(
    /// Identifier of an account (a customer or prospect company).
    AccountId
);
backend_id!(
    /// Identifier of a contact person attached to an account.
    ContactId
);
backend_id!(
    /// Identifier of a note attached to an account.
    NoteId
);
backend_id!(
    /// Identifier of an organization (the tenant that owns accounts).
    OrganizationId
);
backend_id!(
    /// Identifier of a user, as known to the backend.
    UserId
);

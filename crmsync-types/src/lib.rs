//! Core type definitions for crmsync.
//!
//! The backend owns every domain entity; this crate gives those payloads a
//! typed shape on the client side:
//! - Opaque identifiers (`AccountId`, `ContactId`, ...)
//! - Accounts, contacts, notes, organizations, members and permissions
//! - List filters and the pagination envelope
//! - Field-level validation errors
//!
//! Every payload keeps fields it does not model in an `extra` map, so a
//! backend that grows new fields never loses data on a round trip.

mod account;
mod contact;
mod ids;
mod note;
mod organization;
mod page;
mod session;
mod validation;

pub use account::{Account, AccountFilter, AccountInsights, AccountPatch, NewAccount, Tier};
pub use contact::{Contact, ContactFilter, ContactPatch, NewContact};
pub use ids::{AccountId, ContactId, NoteId, OrganizationId, UserId};
pub use note::{NewNote, Note, NotePatch};
pub use organization::{
    Member, NewOrganization, Organization, OrganizationPatch, Permissions, Role,
};
pub use page::Page;
pub use session::{BackendSession, BackendUser, LoginToken};
pub use validation::ValidationErrors;

/// Unmodelled backend fields, preserved verbatim.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid tier: {0}")]
    InvalidTier(String),
}

//! Note payloads.

use crate::Extra;
use crate::ids::{AccountId, NoteId, UserId};
use serde::{Deserialize, Serialize};

/// A free-text note attached to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub account_id: AccountId,
    pub body: String,
    #[serde(default)]
    pub author_id: Option<UserId>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Body of a note creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    pub body: String,
}

/// Partial update of a note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

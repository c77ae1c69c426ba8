//! Payloads exchanged with the backend's session and survey endpoints.

use crate::Extra;
use crate::ids::{OrganizationId, UserId};
use serde::{Deserialize, Serialize};

/// The backend's view of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Response of `POST /auth/session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSession {
    pub token: String,
    pub user: BackendUser,
}

/// Response of `GET /formbricks/login-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginToken {
    pub token: String,
}

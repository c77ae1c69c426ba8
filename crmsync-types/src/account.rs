//! Account payloads and list filters.

use crate::ids::{AccountId, OrganizationId};
use crate::{Error, Extra};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account tier used for prioritisation.
///
/// The canonical wire form is `tier_1`..`tier_3`. Older backend rows carry
/// the `Tire N` spelling, which is accepted on input and never produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "tier_1", alias = "Tire 1")]
    Tier1,
    #[serde(rename = "tier_2", alias = "Tire 2")]
    Tier2,
    #[serde(rename = "tier_3", alias = "Tire 3")]
    Tier3,
}

impl Tier {
    /// Returns the canonical wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Tier::Tier1 => "tier_1",
            Tier::Tier2 => "tier_2",
            Tier::Tier3 => "tier_3",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "tier_1" | "Tire 1" => Ok(Tier::Tier1),
            "tier_2" | "Tire 2" => Ok(Tier::Tier2),
            "tier_3" | "Tire 3" => Ok(Tier::Tier3),
            other => Err(Error::InvalidTier(other.to_string())),
        }
    }
}

/// An account as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    #[serde(default)]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    /// Summary field embedded in the detail view; changes when contacts change.
    #[serde(default)]
    pub contact_count: Option<u32>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Fields this client does not model, preserved verbatim.
    #[serde(flatten)]
    pub extra: Extra,
}

/// Body of an account creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Partial update of an account. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Filter for the account list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl AccountFilter {
    /// Filter matching accounts whose name contains `search`.
    #[must_use]
    pub fn search(search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            ..Default::default()
        }
    }

    /// Restricts the filter to a tier.
    #[must_use]
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Sets the page window.
    #[must_use]
    pub fn with_page(mut self, skip: u32, limit: u32) -> Self {
        self.skip = Some(skip);
        self.limit = Some(limit);
        self
    }
}

/// Aggregated figures shown on the account dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInsights {
    #[serde(default)]
    pub contact_count: u32,
    #[serde(default)]
    pub note_count: u32,
    #[serde(default)]
    pub last_activity_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

//! Query key registry.
//!
//! Reads and invalidations build their keys here so they always address the
//! same cache entries. Layout:
//!
//! ```text
//! all(r)            [r]
//! lists(r)          [r, "list"]
//! list(r, params)   [r, "list", {params}]
//! detail(r, id)     [r, "list", "detail", id]
//! ```
//!
//! so `detail(r, id)` descends from `lists(r)`, which descends from `all(r)`.

use crate::key::{KeyPart, QueryKey, Resource};
use serde::Serialize;

const LIST: &str = "list";
const DETAIL: &str = "detail";

/// Every key of a resource.
pub fn all(resource: Resource) -> QueryKey {
    QueryKey::root(resource)
}

/// Parent of every list and detail key of a resource.
pub fn lists(resource: Resource) -> QueryKey {
    all(resource).with(LIST)
}

/// A filtered list. Equal filters produce equal keys.
pub fn list<P: Serialize + ?Sized>(resource: Resource, params: &P) -> QueryKey {
    lists(resource).with(KeyPart::params(params))
}

/// Parent of every detail key of a resource.
pub fn details(resource: Resource) -> QueryKey {
    lists(resource).with(DETAIL)
}

/// A single entity.
pub fn detail(resource: Resource, id: impl AsRef<str>) -> QueryKey {
    details(resource).with(id.as_ref())
}

/// Contacts of one account.
pub fn account_contacts(account_id: impl AsRef<str>) -> QueryKey {
    detail(Resource::Accounts, account_id).with("contacts")
}

/// Dashboard figures of one account.
pub fn account_insights(account_id: impl AsRef<str>) -> QueryKey {
    detail(Resource::Accounts, account_id).with("insights")
}

/// Notes of one account.
pub fn account_notes(account_id: impl AsRef<str>) -> QueryKey {
    detail(Resource::Accounts, account_id).with("notes")
}

/// Members of one organization.
pub fn organization_members(organization_id: impl AsRef<str>) -> QueryKey {
    detail(Resource::Organizations, organization_id).with("members")
}

/// Returns true for `lists(r)` and `list(r, params)` keys, but not details.
pub fn is_list_key(resource: Resource, key: &QueryKey) -> bool {
    if !key.starts_with(&lists(resource)) {
        return false;
    }
    match key.parts() {
        [_, _] => true,
        [_, _, KeyPart::Params(_)] => true,
        _ => false,
    }
}

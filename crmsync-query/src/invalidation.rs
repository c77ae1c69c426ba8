use crate::key::{QueryKey, Resource};
use crate::keys;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One item of a mutation's declared invalidation set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Invalidation {
    /// Every key starting with this key, the key itself included.
    Prefix(QueryKey),
    /// Only this key.
    Exact(QueryKey),
    /// `lists(r)` and every `list(r, params)`, but no detail keys.
    Lists(Resource),
}

impl Invalidation {
    pub fn prefix(key: QueryKey) -> Self {
        Invalidation::Prefix(key)
    }

    pub fn exact(key: QueryKey) -> Self {
        Invalidation::Exact(key)
    }

    pub fn lists(resource: Resource) -> Self {
        Invalidation::Lists(resource)
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Invalidation::Prefix(prefix) => key.starts_with(prefix),
            Invalidation::Exact(exact) => key == exact,
            Invalidation::Lists(resource) => keys::is_list_key(*resource, key),
        }
    }
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invalidation::Prefix(key) => write!(f, "{key}/*"),
            Invalidation::Exact(key) => write!(f, "{key}"),
            Invalidation::Lists(resource) => write!(f, "{resource}/list/{{*}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefix_covers_descendants() {
        let target = Invalidation::prefix(keys::all(Resource::Accounts));
        assert!(target.matches(&keys::detail(Resource::Accounts, "a1")));
        assert!(target.matches(&keys::account_notes("a1")));
        assert!(!target.matches(&keys::detail(Resource::Contacts, "c1")));
    }

    #[test]
    fn exact_skips_children() {
        let target = Invalidation::exact(keys::detail(Resource::Accounts, "a1"));
        assert!(target.matches(&keys::detail(Resource::Accounts, "a1")));
        assert!(!target.matches(&keys::account_contacts("a1")));
        assert!(!target.matches(&keys::detail(Resource::Accounts, "a2")));
    }

    #[test]
    fn lists_skip_details() {
        let target = Invalidation::lists(Resource::Contacts);
        assert!(target.matches(&keys::list(Resource::Contacts, &json!({"search": "x"}))));
        assert!(target.matches(&keys::lists(Resource::Contacts)));
        assert!(!target.matches(&keys::detail(Resource::Contacts, "c1")));
    }
}

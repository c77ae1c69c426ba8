use crate::{Accounts, Contacts, Notes, Organizations, Permissions, Surveys};
use crmsync_client::{ApiClient, ApiError, ApiResult, ClientConfig};
use crmsync_query::{Query, QueryClient, QueryConfig, QueryKey};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{debug, info};

/// Entry point of the SDK: one backend adapter plus the query cache it feeds.
#[derive(Clone)]
pub struct Crm {
    api: ApiClient,
    queries: QueryClient,
}

impl fmt::Debug for Crm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crm")
            .field("api_base_url", &self.api.config().api_base_url)
            .field("queries", &self.queries)
            .finish()
    }
}

impl Crm {
    pub fn new(api: ApiClient, queries: QueryClient) -> Self {
        Self { api, queries }
    }

    /// Builds the adapter and a cache with default settings.
    pub fn from_config(config: ClientConfig) -> ApiResult<Self> {
        info!(api_base_url = %config.api_base_url, "crm client configured");
        Ok(Self::new(
            ApiClient::new(config)?,
            QueryClient::new(QueryConfig::default()),
        ))
    }

    /// Reads the configuration from the environment.
    pub fn from_env() -> ApiResult<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn accounts(&self) -> Accounts {
        Accounts::new(self.clone())
    }

    pub fn contacts(&self) -> Contacts {
        Contacts::new(self.clone())
    }

    pub fn notes(&self) -> Notes {
        Notes::new(self.clone())
    }

    pub fn organizations(&self) -> Organizations {
        Organizations::new(self.clone())
    }

    pub fn permissions(&self) -> Permissions {
        Permissions::new(self.clone())
    }

    pub fn surveys(&self) -> Surveys {
        Surveys::new(self.clone())
    }

    /// GET `path` cached under `key`; `None` yields a disabled query.
    pub(crate) fn get_query<T>(&self, target: Option<(QueryKey, String)>) -> Query<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let Some((key, path)) = target else {
            debug!(data = std::any::type_name::<T>(), "identifier missing, query disabled");
            return Query::disabled(&self.queries);
        };
        let api = self.api.clone();
        Query::new(&self.queries, Some(key), move || {
            let api = api.clone();
            let path = path.clone();
            async move { api.get_json::<T>(&path).await }
        })
    }

    /// GET `path?filter` cached under `key`.
    pub(crate) fn list_query<T, F>(&self, key: QueryKey, path: &'static str, filter: F) -> Query<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Serialize + Send + Sync + 'static,
    {
        let api = self.api.clone();
        let filter = std::sync::Arc::new(filter);
        Query::new(&self.queries, Some(key), move || {
            let api = api.clone();
            let filter = filter.clone();
            async move { api.get_json_with_query::<T, F>(path, filter.as_ref()).await }
        })
    }
}

/// Returns the id if it is present and not blank.
pub(crate) fn present<I: AsRef<str>>(id: Option<I>) -> Option<I> {
    id.filter(|id| !id.as_ref().trim().is_empty())
}

/// Path segment for a required identifier, checked before any request.
pub(crate) fn segment(id: &impl AsRef<str>, name: &'static str) -> ApiResult<String> {
    let id = id.as_ref();
    if id.trim().is_empty() {
        return Err(ApiError::MissingIdentifier(name));
    }
    Ok(urlencoding::encode(id).into_owned())
}

/// Variables of an update mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Update<I, P> {
    pub id: I,
    pub patch: P,
}

impl<I, P> Update<I, P> {
    pub fn new(id: impl Into<I>, patch: P) -> Self {
        Self {
            id: id.into(),
            patch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmsync_types::AccountId;

    #[test]
    fn blank_ids_are_absent() {
        assert!(present(Some(AccountId::new("  "))).is_none());
        assert!(present::<AccountId>(None).is_none());
        assert_eq!(present(Some(AccountId::new("a1"))), Some(AccountId::new("a1")));
    }

    #[test]
    fn segments_are_checked_and_encoded() {
        assert!(matches!(
            segment(&AccountId::new(""), "account_id"),
            Err(ApiError::MissingIdentifier("account_id"))
        ));
        assert_eq!(segment(&"a b/c", "id").unwrap(), "a%20b%2Fc");
    }
}

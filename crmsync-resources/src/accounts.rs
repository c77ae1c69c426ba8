//! Account reads and writes.

use crate::crm::{Crm, Update, present, segment};
use crmsync_client::Method;
use crmsync_query::{Invalidation, Mutation, Query, Resource, keys};
use crmsync_types::{
    Account, AccountFilter, AccountId, AccountInsights, AccountPatch, NewAccount, Page,
};

pub type UpdateAccount = Update<AccountId, AccountPatch>;

#[derive(Debug, Clone)]
pub struct Accounts {
    crm: Crm,
}

impl Accounts {
    pub(crate) fn new(crm: Crm) -> Self {
        Self { crm }
    }

    /// `GET /accounts` with the filter as query string.
    pub fn list(&self, filter: AccountFilter) -> Query<Page<Account>> {
        let key = keys::list(Resource::Accounts, &filter);
        self.crm.list_query(key, "/accounts", filter)
    }

    /// A single account. Disabled while `id` is absent or blank.
    pub fn detail(&self, id: impl Into<Option<AccountId>>) -> Query<Account> {
        self.crm.get_query(present(id.into()).map(|id| {
            let path = format!("/accounts/{}", urlencoding::encode(id.as_str()));
            (keys::detail(Resource::Accounts, &id), path)
        }))
    }

    /// Dashboard figures of one account.
    pub fn insights(&self, id: impl Into<Option<AccountId>>) -> Query<AccountInsights> {
        self.crm.get_query(present(id.into()).map(|id| {
            let path = format!("/accounts/{}/insights", urlencoding::encode(id.as_str()));
            (keys::account_insights(&id), path)
        }))
    }

    pub fn create(&self) -> Mutation<NewAccount, Account> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "create_account",
            move |account: NewAccount| {
                let api = api.clone();
                async move {
                    api.send_json::<_, Account>(Method::POST, "/accounts", &account)
                        .await
                }
            },
            |_: &NewAccount, _: &Account| create_invalidations(),
        )
    }

    pub fn update(&self) -> Mutation<UpdateAccount, Account> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "update_account",
            move |update: UpdateAccount| {
                let api = api.clone();
                async move {
                    let path = format!("/accounts/{}", segment(&update.id, "account_id")?);
                    api.send_json::<_, Account>(Method::PATCH, &path, &update.patch)
                        .await
                }
            },
            |update: &UpdateAccount, _: &Account| update_invalidations(&update.id),
        )
    }

    pub fn delete(&self) -> Mutation<AccountId, ()> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "delete_account",
            move |id: AccountId| {
                let api = api.clone();
                async move {
                    let path = format!("/accounts/{}", segment(&id, "account_id")?);
                    api.delete(&path).await
                }
            },
            |_: &AccountId, _: &()| delete_invalidations(),
        )
    }
}

pub(crate) fn create_invalidations() -> Vec<Invalidation> {
    vec![Invalidation::lists(Resource::Accounts)]
}

pub(crate) fn update_invalidations(id: &AccountId) -> Vec<Invalidation> {
    vec![
        Invalidation::exact(keys::detail(Resource::Accounts, id)),
        Invalidation::lists(Resource::Accounts),
    ]
}

/// Everything under the account plus contact and note lists, which may be
/// filtered by it.
pub(crate) fn delete_invalidations() -> Vec<Invalidation> {
    vec![
        Invalidation::prefix(keys::all(Resource::Accounts)),
        Invalidation::lists(Resource::Contacts),
        Invalidation::lists(Resource::Notes),
    ]
}

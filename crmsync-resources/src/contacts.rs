//! Contact reads and writes.
//!
//! Contacts are created under an account, so contact writes also refresh
//! the owning account's contact list, detail and insights.

use crate::crm::{Crm, Update, present, segment};
use crmsync_client::Method;
use crmsync_query::{Invalidation, Mutation, Query, Resource, keys};
use crmsync_types::{AccountId, Contact, ContactFilter, ContactId, ContactPatch, NewContact, Page};

pub type UpdateContact = Update<ContactId, ContactPatch>;

/// Variables of [`Contacts::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateContact {
    pub account_id: AccountId,
    pub contact: NewContact,
}

/// Variables of [`Contacts::delete`]. The account id is needed to refresh
/// the owning account.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteContact {
    pub id: ContactId,
    pub account_id: AccountId,
}

#[derive(Debug, Clone)]
pub struct Contacts {
    crm: Crm,
}

impl Contacts {
    pub(crate) fn new(crm: Crm) -> Self {
        Self { crm }
    }

    pub fn list(&self, filter: ContactFilter) -> Query<Page<Contact>> {
        let key = keys::list(Resource::Contacts, &filter);
        self.crm.list_query(key, "/contacts", filter)
    }

    pub fn detail(&self, id: impl Into<Option<ContactId>>) -> Query<Contact> {
        self.crm.get_query(present(id.into()).map(|id| {
            let path = format!("/contacts/{}", urlencoding::encode(id.as_str()));
            (keys::detail(Resource::Contacts, &id), path)
        }))
    }

    /// Contacts of one account. Disabled while the account id is absent.
    pub fn for_account(&self, account_id: impl Into<Option<AccountId>>) -> Query<Vec<Contact>> {
        self.crm.get_query(present(account_id.into()).map(|id| {
            let path = format!("/accounts/{}/contacts", urlencoding::encode(id.as_str()));
            (keys::account_contacts(&id), path)
        }))
    }

    pub fn create(&self) -> Mutation<CreateContact, Contact> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "create_contact",
            move |vars: CreateContact| {
                let api = api.clone();
                async move {
                    let path = format!(
                        "/accounts/{}/contacts",
                        segment(&vars.account_id, "account_id")?
                    );
                    api.send_json::<_, Contact>(Method::POST, &path, &vars.contact)
                        .await
                }
            },
            |vars: &CreateContact, _: &Contact| create_invalidations(&vars.account_id),
        )
    }

    pub fn update(&self) -> Mutation<UpdateContact, Contact> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "update_contact",
            move |update: UpdateContact| {
                let api = api.clone();
                async move {
                    let path = format!("/contacts/{}", segment(&update.id, "contact_id")?);
                    api.send_json::<_, Contact>(Method::PATCH, &path, &update.patch)
                        .await
                }
            },
            |update: &UpdateContact, contact: &Contact| {
                update_invalidations(&update.id, &contact.account_id)
            },
        )
    }

    pub fn delete(&self) -> Mutation<DeleteContact, ()> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "delete_contact",
            move |vars: DeleteContact| {
                let api = api.clone();
                async move {
                    segment(&vars.account_id, "account_id")?;
                    let path = format!("/contacts/{}", segment(&vars.id, "contact_id")?);
                    api.delete(&path).await
                }
            },
            |vars: &DeleteContact, _: &()| delete_invalidations(&vars.id, &vars.account_id),
        )
    }
}

pub(crate) fn create_invalidations(account_id: &AccountId) -> Vec<Invalidation> {
    vec![
        Invalidation::prefix(keys::account_contacts(account_id)),
        Invalidation::exact(keys::detail(Resource::Accounts, account_id)),
        Invalidation::lists(Resource::Contacts),
        Invalidation::prefix(keys::account_insights(account_id)),
    ]
}

pub(crate) fn update_invalidations(id: &ContactId, account_id: &AccountId) -> Vec<Invalidation> {
    vec![
        Invalidation::exact(keys::detail(Resource::Contacts, id)),
        Invalidation::lists(Resource::Contacts),
        Invalidation::prefix(keys::account_contacts(account_id)),
    ]
}

pub(crate) fn delete_invalidations(id: &ContactId, account_id: &AccountId) -> Vec<Invalidation> {
    let mut targets = update_invalidations(id, account_id);
    targets.push(Invalidation::exact(keys::detail(Resource::Accounts, account_id)));
    targets.push(Invalidation::prefix(keys::account_insights(account_id)));
    targets
}

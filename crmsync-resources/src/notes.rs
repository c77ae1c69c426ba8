//! Note reads and writes.

use crate::crm::{Crm, Update, present, segment};
use crmsync_client::Method;
use crmsync_query::{Invalidation, Mutation, Query, Resource, keys};
use crmsync_types::{AccountId, NewNote, Note, NoteId, NotePatch};

pub type UpdateNote = Update<NoteId, NotePatch>;

#[derive(Debug, Clone, PartialEq)]
pub struct CreateNote {
    pub account_id: AccountId,
    pub note: NewNote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteNote {
    pub id: NoteId,
    pub account_id: AccountId,
}

#[derive(Debug, Clone)]
pub struct Notes {
    crm: Crm,
}

impl Notes {
    pub(crate) fn new(crm: Crm) -> Self {
        Self { crm }
    }

    pub fn detail(&self, id: impl Into<Option<NoteId>>) -> Query<Note> {
        self.crm.get_query(present(id.into()).map(|id| {
            let path = format!("/notes/{}", urlencoding::encode(id.as_str()));
            (keys::detail(Resource::Notes, &id), path)
        }))
    }

    pub fn for_account(&self, account_id: impl Into<Option<AccountId>>) -> Query<Vec<Note>> {
        self.crm.get_query(present(account_id.into()).map(|id| {
            let path = format!("/accounts/{}/notes", urlencoding::encode(id.as_str()));
            (keys::account_notes(&id), path)
        }))
    }

    pub fn create(&self) -> Mutation<CreateNote, Note> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "create_note",
            move |vars: CreateNote| {
                let api = api.clone();
                async move {
                    let path = format!("/accounts/{}/notes", segment(&vars.account_id, "account_id")?);
                    api.send_json::<_, Note>(Method::POST, &path, &vars.note)
                        .await
                }
            },
            |vars: &CreateNote, _: &Note| invalidations(&vars.account_id, None),
        )
    }

    pub fn update(&self) -> Mutation<UpdateNote, Note> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "update_note",
            move |update: UpdateNote| {
                let api = api.clone();
                async move {
                    let path = format!("/notes/{}", segment(&update.id, "note_id")?);
                    api.send_json::<_, Note>(Method::PATCH, &path, &update.patch)
                        .await
                }
            },
            |update: &UpdateNote, note: &Note| invalidations(&note.account_id, Some(&update.id)),
        )
    }

    pub fn delete(&self) -> Mutation<DeleteNote, ()> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "delete_note",
            move |vars: DeleteNote| {
                let api = api.clone();
                async move {
                    segment(&vars.account_id, "account_id")?;
                    let path = format!("/notes/{}", segment(&vars.id, "note_id")?);
                    api.delete(&path).await
                }
            },
            |vars: &DeleteNote, _: &()| invalidations(&vars.account_id, Some(&vars.id)),
        )
    }
}

/// Notes and insights of the account, every note list, and the note itself
/// once it exists.
pub(crate) fn invalidations(account_id: &AccountId, note: Option<&NoteId>) -> Vec<Invalidation> {
    let mut targets = vec![
        Invalidation::prefix(keys::account_notes(account_id)),
        Invalidation::lists(Resource::Notes),
        Invalidation::prefix(keys::account_insights(account_id)),
    ];
    if let Some(id) = note {
        targets.push(Invalidation::exact(keys::detail(Resource::Notes, id)));
    }
    targets
}

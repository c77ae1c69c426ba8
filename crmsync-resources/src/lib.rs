//! Typed access to every crmsync backend resource.
//!
//! [`Crm`] bundles the REST adapter with the query cache. Each resource
//! handle returns [`Query`](crmsync_query::Query) observers for reads and
//! [`Mutation`](crmsync_query::Mutation)s for writes; a successful write
//! invalidates exactly the keys whose data it may have changed.
//!
//! ```text
//! accounts        list · detail · insights · create · update · delete
//! contacts        list · detail · for_account · create · update · delete
//! notes           detail · for_account · create · update · delete
//! organizations   list · detail · members · create · update · delete · promote_member
//! permissions     mine
//! surveys         login_token · embed_url
//! ```

mod accounts;
mod contacts;
mod crm;
mod notes;
mod organizations;
mod surveys;

pub use accounts::{Accounts, UpdateAccount};
pub use contacts::{Contacts, CreateContact, DeleteContact, UpdateContact};
pub use crm::{Crm, Update};
pub use notes::{CreateNote, DeleteNote, Notes, UpdateNote};
pub use organizations::{Organizations, Permissions, PromoteMember, UpdateOrganization};
pub use surveys::Surveys;

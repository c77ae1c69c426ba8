//! Organizations, their members and the signed-in user's permissions.

use crate::crm::{Crm, Update, present, segment};
use crmsync_client::Method;
use crmsync_query::{Invalidation, Mutation, Query, Resource, keys};
use crmsync_types::{
    Member, NewOrganization, Organization, OrganizationId, OrganizationPatch,
    Permissions as PermissionSet, UserId,
};

pub type UpdateOrganization = Update<OrganizationId, OrganizationPatch>;

/// Variables of [`Organizations::promote_member`].
#[derive(Debug, Clone, PartialEq)]
pub struct PromoteMember {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct Organizations {
    crm: Crm,
}

impl Organizations {
    pub(crate) fn new(crm: Crm) -> Self {
        Self { crm }
    }

    pub fn list(&self) -> Query<Vec<Organization>> {
        let key = keys::list(Resource::Organizations, &());
        self.crm.get_query(Some((key, "/organizations".to_string())))
    }

    pub fn detail(&self, id: impl Into<Option<OrganizationId>>) -> Query<Organization> {
        self.crm.get_query(present(id.into()).map(|id| {
            let path = format!("/organizations/{}", urlencoding::encode(id.as_str()));
            (keys::detail(Resource::Organizations, &id), path)
        }))
    }

    pub fn members(&self, id: impl Into<Option<OrganizationId>>) -> Query<Vec<Member>> {
        self.crm.get_query(present(id.into()).map(|id| {
            let path = format!("/organizations/{}/members", urlencoding::encode(id.as_str()));
            (keys::organization_members(&id), path)
        }))
    }

    pub fn create(&self) -> Mutation<NewOrganization, Organization> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "create_organization",
            move |org: NewOrganization| {
                let api = api.clone();
                async move {
                    api.send_json::<_, Organization>(Method::POST, "/organizations", &org)
                        .await
                }
            },
            |_: &NewOrganization, _: &Organization| {
                vec![Invalidation::lists(Resource::Organizations)]
            },
        )
    }

    pub fn update(&self) -> Mutation<UpdateOrganization, Organization> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "update_organization",
            move |update: UpdateOrganization| {
                let api = api.clone();
                async move {
                    let path = format!(
                        "/organizations/{}",
                        segment(&update.id, "organization_id")?
                    );
                    api.send_json::<_, Organization>(Method::PATCH, &path, &update.patch)
                        .await
                }
            },
            |update: &UpdateOrganization, _: &Organization| {
                vec![
                    Invalidation::lists(Resource::Organizations),
                    Invalidation::exact(keys::detail(Resource::Organizations, &update.id)),
                ]
            },
        )
    }

    pub fn delete(&self) -> Mutation<OrganizationId, ()> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "delete_organization",
            move |id: OrganizationId| {
                let api = api.clone();
                async move {
                    let path = format!("/organizations/{}", segment(&id, "organization_id")?);
                    api.delete(&path).await
                }
            },
            |_: &OrganizationId, _: &()| {
                vec![
                    Invalidation::lists(Resource::Organizations),
                    Invalidation::prefix(keys::all(Resource::Organizations)),
                ]
            },
        )
    }

    /// Promotes a member to admin. Also refreshes the caller's own
    /// permissions, which may depend on the membership.
    pub fn promote_member(&self) -> Mutation<PromoteMember, Member> {
        let api = self.crm.api().clone();
        Mutation::new(
            self.crm.queries(),
            "promote_member",
            move |vars: PromoteMember| {
                let api = api.clone();
                async move {
                    let path = format!(
                        "/organizations/{}/members/{}/promote",
                        segment(&vars.organization_id, "organization_id")?,
                        segment(&vars.user_id, "user_id")?
                    );
                    api.send_json::<_, Member>(Method::POST, &path, &serde_json::json!({}))
                        .await
                }
            },
            |vars: &PromoteMember, _: &Member| {
                vec![
                    Invalidation::prefix(keys::organization_members(&vars.organization_id)),
                    Invalidation::prefix(keys::all(Resource::Permissions)),
                ]
            },
        )
    }
}

/// The signed-in user's permissions.
#[derive(Debug, Clone)]
pub struct Permissions {
    crm: Crm,
}

impl Permissions {
    pub(crate) fn new(crm: Crm) -> Self {
        Self { crm }
    }

    /// `GET /permissions/me`.
    pub fn mine(&self) -> Query<PermissionSet> {
        let key = keys::all(Resource::Permissions).with("me");
        self.crm.get_query(Some((key, "/permissions/me".to_string())))
    }
}

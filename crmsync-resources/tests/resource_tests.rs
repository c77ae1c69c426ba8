mod common;

use common::{account, contact, hits, mock_crm, page, wait_for};
use crmsync_client::ApiError;
use crmsync_query::{MutationStatus, Resource, keys};
use crmsync_resources::{CreateContact, PromoteMember, Update};
use crmsync_types::{
    AccountFilter, AccountId, AccountPatch, NewAccount, NewContact, OrganizationId, Role, Tier,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Accounts ────────────────────────────────────────────────────

#[tokio::test]
async fn created_account_is_readable_through_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts"))
        .and(body_json(json!({"name": "Metro Health", "tier": "tier_1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(account("acc_7", "Metro Health", "tier_1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts/acc_7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account("acc_7", "Metro Health", "tier_1")))
        .expect(1)
        .mount(&server)
        .await;

    let crm = mock_crm(&server).await;
    let accounts = crm.accounts();

    let created = accounts
        .create()
        .mutate(NewAccount {
            name: "Metro Health".into(),
            tier: Some(Tier::Tier1),
            ..Default::default()
        })
        .await
        .unwrap();

    let detail = accounts.detail(created.id.clone());
    let fetched = detail.data().await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.name, "Metro Health");
    assert_eq!(fetched.tier, Some(Tier::Tier1));
}

#[tokio::test]
async fn metro_tier_one_list_is_shared_and_refreshed_by_create() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .and(query_param("search", "Metro"))
        .and(query_param("tier", "tier_1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![account("acc_1", "Metro General", "tier_1")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(account("acc_2", "Metro East", "tier_1")))
        .mount(&server)
        .await;

    let crm = mock_crm(&server).await;
    let accounts = crm.accounts();

    let mut first = accounts.list(AccountFilter::search("Metro").with_tier(Tier::Tier1));
    let second = accounts.list(AccountFilter {
        tier: Some(Tier::Tier1),
        search: Some("Metro".into()),
        ..Default::default()
    });
    assert_eq!(first.key(), second.key());

    let a = first.data().await.unwrap();
    let b = second.data().await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.items[0].name, "Metro General");
    assert_eq!(hits(&server, "GET", "/accounts").await, 1);

    accounts
        .create()
        .mutate(NewAccount {
            name: "Metro East".into(),
            tier: Some(Tier::Tier1),
            ..Default::default()
        })
        .await
        .unwrap();

    let refreshed = wait_for(&mut first, |s| {
        s.data.as_ref().is_some_and(|d| !Arc::ptr_eq(d, &a)) && !s.is_fetching
    })
    .await;
    assert!(!refreshed.is_stale);
    assert_eq!(hits(&server, "GET", "/accounts").await, 2);
}

#[tokio::test]
async fn missing_id_disables_detail_query() {
    let server = MockServer::start().await;
    let crm = mock_crm(&server).await;

    let absent = crm.accounts().detail(None::<AccountId>);
    let blank = crm.accounts().detail(AccountId::new("   "));
    assert!(!absent.is_enabled());
    assert!(!blank.is_enabled());

    let state = blank.fetch().await;
    assert!(!state.is_loading);
    assert!(state.data.is_none());
    assert!(matches!(absent.data().await, Err(ApiError::MissingIdentifier(_))));

    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(crm.queries().is_empty());
}

#[tokio::test]
async fn update_without_id_fails_before_any_request() {
    let server = MockServer::start().await;
    let crm = mock_crm(&server).await;

    let update = crm.accounts().update();
    let err = update
        .mutate(Update::new("", AccountPatch::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::MissingIdentifier("account_id")));
    assert_eq!(update.record().status, MutationStatus::Error);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_create_reports_fields_and_keeps_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": [{"loc": ["body", "name"], "msg": "field required"}]
        })))
        .mount(&server)
        .await;

    let crm = mock_crm(&server).await;
    let accounts = crm.accounts();
    let list = accounts.list(AccountFilter::default());
    list.fetch().await;

    let create = accounts.create();
    let err = create.mutate(NewAccount::default()).await.unwrap_err();
    assert!(err.is_validation());
    assert!(create.record().is_validation_error());
    assert_eq!(
        err.field_errors().unwrap().field("name"),
        ["field required".to_string()]
    );

    assert!(!list.state().is_stale);
    assert_eq!(hits(&server, "GET", "/accounts").await, 1);
}

// ── Contacts ────────────────────────────────────────────────────

#[tokio::test]
async fn creating_a_contact_refreshes_account_views() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account("a1", "Acme", "tier_2")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts/a1/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([contact("c1", "a1")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts/a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account("a2", "Other", "tier_3")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/a1/contacts"))
        .and(body_json(json!({"first_name": "Grace", "is_primary": true})))
        .respond_with(ResponseTemplate::new(201).set_body_json(contact("c2", "a1")))
        .expect(1)
        .mount(&server)
        .await;

    let crm = mock_crm(&server).await;
    let mut detail = crm.accounts().detail(AccountId::new("a1"));
    let mut contacts = crm.contacts().for_account(AccountId::new("a1"));
    let unrelated = crm.accounts().detail(AccountId::new("a2"));
    detail.fetch().await;
    contacts.fetch().await;
    unrelated.fetch().await;

    crm.contacts()
        .create()
        .mutate(CreateContact {
            account_id: AccountId::new("a1"),
            contact: NewContact {
                first_name: Some("Grace".into()),
                is_primary: true,
                ..Default::default()
            },
        })
        .await
        .unwrap();

    wait_for(&mut detail, |s| !s.is_stale && !s.is_fetching).await;
    wait_for(&mut contacts, |s| !s.is_stale && !s.is_fetching).await;

    assert_eq!(hits(&server, "GET", "/accounts/a1").await, 2);
    assert_eq!(hits(&server, "GET", "/accounts/a1/contacts").await, 2);
    assert_eq!(hits(&server, "GET", "/accounts/a2").await, 1);
    assert!(!unrelated.state().is_stale);
}

// ── Organizations and permissions ───────────────────────────────

#[tokio::test]
async fn promoting_a_member_refreshes_permissions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizations/o1/members"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"user_id": "u2", "role": "member"}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/permissions/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"role": "owner", "permissions": ["members:promote"]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/organizations/o1/members/u2/promote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_id": "u2", "role": "admin"})))
        .expect(1)
        .mount(&server)
        .await;

    let crm = mock_crm(&server).await;
    let orgs = crm.organizations();
    let mut members = orgs.members(OrganizationId::new("o1"));
    let mut permissions = crm.permissions().mine();
    members.fetch().await;
    let mine = permissions.data().await.unwrap();
    assert!(mine.allows("members:promote"));

    let promoted = orgs
        .promote_member()
        .mutate(PromoteMember {
            organization_id: OrganizationId::new("o1"),
            user_id: "u2".into(),
        })
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Admin);

    wait_for(&mut members, |s| !s.is_stale && !s.is_fetching).await;
    wait_for(&mut permissions, |s| !s.is_stale && !s.is_fetching).await;
    assert_eq!(hits(&server, "GET", "/organizations/o1/members").await, 2);
    assert_eq!(hits(&server, "GET", "/permissions/me").await, 2);
}

// ── Surveys ─────────────────────────────────────────────────────

#[tokio::test]
async fn survey_embed_url_uses_a_fresh_token_each_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/formbricks/login-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok+1/="})))
        .expect(2)
        .mount(&server)
        .await;

    let crm = mock_crm(&server).await;
    let surveys = crm.surveys();

    let url = surveys.fetch_embed_url().await.unwrap();
    assert_eq!(url, "https://surveys.example.com/s/onboarding?token=tok%2B1%2F%3D");

    // zero stale time: a second read goes back to the server
    let token = surveys.login_token();
    assert!(token.state().is_stale);
    token.fetch().await;

    assert!(crm.queries().contains(&keys::all(Resource::Surveys).with("login_token")));
}

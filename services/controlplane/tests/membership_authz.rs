mod common;

use common::{FaultyStore, bind, core, core_with_store, group};
use controlplane::auth::principal::Identity;
use controlplane::auth::rbac::authorize::REASON_INTERNAL_ERROR;
use controlplane::auth::rbac::{Decision, ReviewItem};
use controlplane::error::Error;
use controlplane::model::{MemberType, PageQuery, PostMember, ROOT_GROUP_ID, ResourceType};
use controlplane::store::MemberStore;
use std::sync::Arc;

fn post(group_id: u64, user: u64, role: &str) -> PostMember {
    PostMember {
        resource_type: ResourceType::Group,
        resource_id: group_id,
        member_type: MemberType::User,
        member_name_id: user,
        role: role.to_string(),
    }
}

#[tokio::test]
async fn specific_owner_binding_beats_inherited_guest() {
    let state = core();
    let g = group(&state, "g", ROOT_GROUP_ID).await;
    let s = group(&state, "s", g.id).await;
    bind(&state, g.id, 42, "guest").await;
    bind(&state, s.id, 42, "owner").await;

    let caller = Identity::user(42, "u");
    let member = state
        .members
        .get_member_of_resource(&caller, ResourceType::Group, s.id)
        .await
        .expect("lookup")
        .expect("bound");
    assert_eq!(member.role, "owner");
    assert_eq!(member.resource_id, s.id);

    let decision = state
        .authorizer
        .authorize_api(&caller, "DELETE", &format!("/apis/core/v1/groups/{}", s.id))
        .await;
    assert!(decision.allowed, "{}", decision.reason);

    // Only the guest binding applies one level up.
    let decision = state
        .authorizer
        .authorize_api(&caller, "DELETE", &format!("/apis/core/v1/groups/{}", g.id))
        .await;
    assert!(!decision.allowed);
    assert!(decision.reason.contains("role=guest"), "{}", decision.reason);
}

#[tokio::test]
async fn effective_members_hold_one_entry_per_identity() {
    let state = core();
    let g = group(&state, "g", ROOT_GROUP_ID).await;
    let s = group(&state, "s", g.id).await;
    bind(&state, g.id, 1, "owner").await;
    bind(&state, g.id, 2, "maintainer").await;
    bind(&state, s.id, 2, "guest").await;

    let listed = state
        .members
        .list_member(ResourceType::Group, s.id, PageQuery::default())
        .await
        .expect("list");
    assert_eq!(listed.total, 2);
    let user2: Vec<_> = listed
        .items
        .iter()
        .filter(|m| m.member_name_id == 2)
        .collect();
    assert_eq!(user2.len(), 1);
    assert_eq!(user2[0].role, "guest");
    assert_eq!(user2[0].resource_id, s.id);
}

#[tokio::test]
async fn lower_ranked_caller_cannot_grant_higher_role() {
    let state = core();
    let g = group(&state, "g", ROOT_GROUP_ID).await;
    bind(&state, g.id, 7, "pe").await;
    let caller = Identity::user(7, "pe-user");

    for role in ["owner", "maintainer"] {
        let err = state
            .members
            .create_member(&caller, post(g.id, 8, role))
            .await
            .expect_err("escalation");
        assert!(matches!(err, Error::GrantHigherRole(_)), "{role}");
    }
    let granted = state
        .members
        .create_member(&caller, post(g.id, 8, "guest"))
        .await
        .expect("lower role");
    let err = state
        .members
        .update_member(&caller, granted.id, "owner")
        .await
        .expect_err("escalation by update");
    assert_eq!(err.code(), "grant_higher_role");
}

#[tokio::test]
async fn review_reports_per_url_and_method() {
    let state = core();
    let g = group(&state, "g", ROOT_GROUP_ID).await;
    bind(&state, g.id, 3, "guest").await;
    let caller = Identity::user(3, "viewer");
    let target = format!("/apis/core/v1/groups/{}", g.id);

    let response = state
        .review
        .review(
            &caller,
            &[
                ReviewItem::new("/apis/core/v1/health", "GET"),
                ReviewItem::new(target.clone(), "GET"),
                ReviewItem::new(target.clone(), "DELETE"),
            ],
        )
        .await;

    let health = &response["/apis/core/v1/health"]["GET"];
    assert!(health.allowed);
    assert_eq!(health.reason, "not checked");
    assert!(response[&target]["GET"].allowed);
    assert!(!response[&target]["DELETE"].allowed);

    let json = serde_json::to_value(&response).expect("json");
    assert_eq!(json["/apis/core/v1/health"]["GET"]["allowed"], true);
}

#[tokio::test]
async fn deleting_a_group_drops_its_bindings() {
    let state = core();
    let g = group(&state, "g", ROOT_GROUP_ID).await;
    bind(&state, g.id, 1, "owner").await;
    bind(&state, g.id, 2, "guest").await;
    state.groups.delete_group(g.id).await.expect("delete");

    let left = state
        .store
        .list_direct_members(ResourceType::Group, g.id)
        .await
        .expect("list");
    assert!(left.is_empty(), "{left:?}");
}

#[tokio::test]
async fn store_failure_during_lookup_denies() {
    let state = core_with_store(Arc::new(FaultyStore::failing_member_reads()));
    let g = group(&state, "g", ROOT_GROUP_ID).await;
    let caller = Identity::user(4, "u4");
    let target = format!("/apis/core/v1/groups/{}", g.id);

    let decision = state.authorizer.authorize_api(&caller, "GET", &target).await;
    assert_eq!(decision, Decision::deny(REASON_INTERNAL_ERROR));

    let response = state
        .review
        .review(&caller, &[ReviewItem::new(target.clone(), "DELETE")])
        .await;
    let result = &response[&target]["DELETE"];
    assert!(!result.allowed);
    assert_eq!(result.reason, REASON_INTERNAL_ERROR);
}

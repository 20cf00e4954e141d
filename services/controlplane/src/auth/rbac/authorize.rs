//! Policy authorizer.
//!
//! # Purpose
//! Maps a resolved caller plus request attributes to an allow/deny decision
//! with a human-readable reason.
//!
//! # Evaluation order
//! 1. `members` and `pipelineruns` endpoints are allowed as `not checked`;
//!    they are authorized by their own handlers, not by this engine.
//! 2. Platform admins are allowed.
//! 3. Non-resource requests and collection requests (no name) are evaluated
//!    against the catalog's default role.
//! 4. Otherwise the resource id is parsed from the name, the caller's closest
//!    binding is resolved, and the bound role's rules are evaluated in order.
//!    The first matching rule decides.
//!
//! # Security considerations
//! - Every failure path denies. An unparsable resource id is `format error`,
//!   a store failure is `internal error`; neither ever allows.
//! - Skippers are applied by [`Authorizer::authorize_api`] before any of the
//!   above and are the only way unscoped traffic passes.
use crate::auth::principal::Identity;
use crate::auth::rbac::skipper::Skipper;
use crate::error::Error;
use crate::membership::MemberService;
use crate::model::{RESOURCE_MEMBERS, RESOURCE_PIPELINERUNS, ResourceType};
use horizon_rbac::{RequestInfo, RequestInfoFactory, Role, RoleCatalog};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const REASON_NOT_CHECKED: &str = "not checked";
pub const REASON_ADMIN: &str = "user is admin";
pub const REASON_MEMBER_NOT_EXIST: &str = "member not exist";
pub const REASON_ROLE_NOT_EXIST: &str = "role not exist";
pub const REASON_FORMAT_ERROR: &str = "format error";
pub const REASON_INTERNAL_ERROR: &str = "internal error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: String,
}

impl Decision {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Attributes<'a> {
    pub identity: &'a Identity,
    pub request: &'a RequestInfo,
}

pub struct Authorizer {
    members: MemberService,
    catalog: Arc<RoleCatalog>,
    skippers: Vec<Skipper>,
    factory: RequestInfoFactory,
}

impl Authorizer {
    pub fn new(members: MemberService, catalog: Arc<RoleCatalog>, skippers: Vec<Skipper>) -> Self {
        Self {
            members,
            catalog,
            skippers,
            factory: RequestInfoFactory::default(),
        }
    }

    pub fn with_request_info_factory(mut self, factory: RequestInfoFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Parse `(method, url)`, apply skippers, then [`Authorizer::authorize`].
    pub async fn authorize_api(&self, identity: &Identity, method: &str, url: &str) -> Decision {
        let request = self.factory.new_request_info(method, url);
        if self.skippers.iter().any(|s| s.matches(method, &request)) {
            return record(Decision::allow(REASON_NOT_CHECKED));
        }
        self.authorize(Attributes {
            identity,
            request: &request,
        })
        .await
    }

    pub async fn authorize(&self, attrs: Attributes<'_>) -> Decision {
        let decision = self.evaluate(attrs).await;
        if !decision.allowed {
            tracing::info!(
                user = attrs.identity.id,
                verb = %attrs.request.verb,
                path = %attrs.request.path,
                reason = %decision.reason,
                "request denied"
            );
        }
        record(decision)
    }

    async fn evaluate(&self, attrs: Attributes<'_>) -> Decision {
        let Attributes { identity, request } = attrs;
        if request.is_resource_request && is_not_checked(request) {
            return Decision::allow(REASON_NOT_CHECKED);
        }
        if identity.is_admin {
            return Decision::allow(REASON_ADMIN);
        }
        if !request.is_resource_request || request.name.is_empty() {
            return self.evaluate_default_role(identity, request);
        }

        let Ok(resource_type) = request.resource.parse::<ResourceType>() else {
            return Decision::deny(REASON_FORMAT_ERROR);
        };
        let Ok(resource_id) = request.name.parse::<u64>() else {
            return Decision::deny(REASON_FORMAT_ERROR);
        };

        let member = match self
            .members
            .get_member_of_resource(identity, resource_type, resource_id)
            .await
        {
            Ok(Some(member)) => member,
            // A missing resource has no bindings either.
            Ok(None) | Err(Error::NotFound(_)) => {
                return Decision::deny(REASON_MEMBER_NOT_EXIST);
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    resource = %resource_type,
                    resource_id,
                    "membership lookup failed during authorization"
                );
                return Decision::deny(REASON_INTERNAL_ERROR);
            }
        };

        let Ok(role) = self.catalog.get_role(&member.role) else {
            tracing::warn!(
                role = %member.role,
                member_id = member.id,
                "binding names an unknown role"
            );
            return Decision::deny(REASON_ROLE_NOT_EXIST);
        };
        match role.first_match(request) {
            Some(idx) => Decision::allow(format!(
                "user {} allowed by member({}) by rule[{idx}]",
                identity.id,
                member.base_info()
            )),
            None => Decision::deny(format!(
                "user {} denied by member({})",
                identity.id,
                member.base_info()
            )),
        }
    }

    fn evaluate_default_role(&self, identity: &Identity, request: &RequestInfo) -> Decision {
        let Some(role) = self.catalog.default_role() else {
            return Decision::deny(REASON_ROLE_NOT_EXIST);
        };
        default_role_decision(identity, role, request)
    }
}

fn default_role_decision(identity: &Identity, role: &Role, request: &RequestInfo) -> Decision {
    match role.first_match(request) {
        Some(idx) => Decision::allow(format!(
            "user {} allowed by default role({}) by rule[{idx}]",
            identity.id, role.name
        )),
        None => Decision::deny(format!(
            "user {} denied by default role({})",
            identity.id, role.name
        )),
    }
}

fn is_not_checked(request: &RequestInfo) -> bool {
    [request.resource.as_str(), request.subresource.as_str()]
        .iter()
        .any(|r| *r == RESOURCE_MEMBERS || *r == RESOURCE_PIPELINERUNS)
}

fn record(decision: Decision) -> Decision {
    let label = if decision.allowed { "allow" } else { "deny" };
    metrics::counter!("horizon_authz_decisions_total", "decision" => label).increment(1);
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemberType, NewGroup, PostMember, ROOT_GROUP_ID};
    use crate::store::memory::InMemoryStore;
    use crate::store::{MemberStore, ResourceStore};

    const ROLES: &str = r#"
RolePriorityRankDesc: [owner, reader]
DefaultRole: reader
Roles:
  - name: owner
    rules:
      - verbs: ["*"]
        apiGroups: ["*"]
        resources: ["*"]
      - verbs: ["*"]
        apiGroups: ["*"]
        resources: ["groups"]
  - name: reader
    rules:
      - verbs: ["get", "list"]
        apiGroups: ["*"]
        resources: ["*"]
      - verbs: ["get"]
        nonResourceURLs: ["/version"]
"#;

    async fn setup() -> (Authorizer, Arc<InMemoryStore>, u64) {
        let store = Arc::new(InMemoryStore::new());
        let catalog = Arc::new(RoleCatalog::from_yaml_str(ROLES).expect("roles"));
        let g = store
            .create_group(NewGroup {
                name: "g".into(),
                path: "g".into(),
                description: String::new(),
                parent_id: ROOT_GROUP_ID,
                created_by: 1,
            })
            .await
            .expect("group");
        store
            .create_member(
                PostMember {
                    resource_type: ResourceType::Group,
                    resource_id: g.id,
                    member_type: MemberType::User,
                    member_name_id: 10,
                    role: "owner".into(),
                },
                0,
            )
            .await
            .expect("owner");
        let members = MemberService::new(store.clone(), catalog.clone());
        (Authorizer::new(members, catalog, Vec::new()), store, g.id)
    }

    #[tokio::test]
    async fn first_matching_rule_is_cited() {
        let (authz, _, g) = setup().await;
        let caller = Identity::user(10, "u10");
        let decision = authz
            .authorize_api(&caller, "DELETE", &format!("/apis/core/v1/groups/{g}"))
            .await;
        assert!(decision.allowed);
        assert!(decision.reason.ends_with("by rule[0]"), "{}", decision.reason);
        assert!(decision.reason.starts_with("user 10 allowed by member(groups/"));
    }

    #[tokio::test]
    async fn fails_closed_on_bad_names_and_missing_members() {
        let (authz, _, g) = setup().await;
        let caller = Identity::user(10, "u10");
        let decision = authz
            .authorize_api(&caller, "GET", "/apis/core/v1/groups/not-a-number")
            .await;
        assert_eq!(decision, Decision::deny(REASON_FORMAT_ERROR));

        let decision = authz
            .authorize_api(&caller, "GET", "/apis/core/v1/widgets/1")
            .await;
        assert_eq!(decision, Decision::deny(REASON_FORMAT_ERROR));

        let stranger = Identity::user(99, "u99");
        let decision = authz
            .authorize_api(&stranger, "GET", &format!("/apis/core/v1/groups/{g}"))
            .await;
        assert_eq!(decision, Decision::deny(REASON_MEMBER_NOT_EXIST));

        let decision = authz
            .authorize_api(&caller, "GET", "/apis/core/v1/groups/404")
            .await;
        assert_eq!(decision, Decision::deny(REASON_MEMBER_NOT_EXIST));
    }

    #[tokio::test]
    async fn unknown_bound_role_is_denied() {
        let (authz, store, g) = setup().await;
        store
            .create_member(
                PostMember {
                    resource_type: ResourceType::Group,
                    resource_id: g,
                    member_type: MemberType::User,
                    member_name_id: 11,
                    role: "retired".into(),
                },
                0,
            )
            .await
            .expect("stale binding");
        let decision = authz
            .authorize_api(&Identity::user(11, "u11"), "GET", &format!("/apis/core/v1/groups/{g}"))
            .await;
        assert_eq!(decision, Decision::deny(REASON_ROLE_NOT_EXIST));
    }

    #[tokio::test]
    async fn members_and_pipelineruns_are_not_checked() {
        let (authz, _, g) = setup().await;
        let stranger = Identity::user(99, "u99");
        for url in [
            format!("/apis/core/v1/groups/{g}/members"),
            "/apis/core/v1/members/3".to_string(),
            "/apis/core/v1/pipelineruns/8".to_string(),
        ] {
            let decision = authz.authorize_api(&stranger, "DELETE", &url).await;
            assert_eq!(decision, Decision::allow(REASON_NOT_CHECKED), "{url}");
        }
    }

    #[tokio::test]
    async fn default_role_covers_collections_and_non_resource_paths() {
        let (authz, _, _) = setup().await;
        let anyone = Identity::user(99, "u99");

        let decision = authz.authorize_api(&anyone, "GET", "/apis/core/v1/groups").await;
        assert!(decision.allowed);
        assert_eq!(decision.reason, "user 99 allowed by default role(reader) by rule[0]");

        let decision = authz.authorize_api(&anyone, "POST", "/apis/core/v1/groups").await;
        assert_eq!(decision, Decision::deny("user 99 denied by default role(reader)"));

        let decision = authz.authorize_api(&anyone, "GET", "/version").await;
        assert!(decision.allowed);
        let decision = authz.authorize_api(&anyone, "GET", "/debug").await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn missing_default_role_denies_collections() {
        let (authz, _, g) = setup().await;
        let catalog = Arc::new(
            RoleCatalog::from_yaml_str(
                r#"
RolePriorityRankDesc: [owner]
Roles:
  - name: owner
    rules:
      - verbs: ["*"]
        apiGroups: ["*"]
        resources: ["*"]
"#,
            )
            .expect("roles without default"),
        );
        let authz = Authorizer { catalog, ..authz };
        let anyone = Identity::user(99, "u99");

        let decision = authz.authorize_api(&anyone, "GET", "/apis/core/v1/groups").await;
        assert_eq!(decision, Decision::deny(REASON_ROLE_NOT_EXIST));
        let decision = authz.authorize_api(&anyone, "GET", "/version").await;
        assert_eq!(decision, Decision::deny(REASON_ROLE_NOT_EXIST));

        // Named resources still resolve through bindings.
        let decision = authz
            .authorize_api(&Identity::user(10, "u10"), "GET", &format!("/apis/core/v1/groups/{g}"))
            .await;
        assert!(decision.allowed, "{}", decision.reason);
    }

    #[tokio::test]
    async fn admins_and_skippers_are_allowed() {
        let (authz, _, _) = setup().await;
        let authz = Authorizer {
            skippers: vec![Skipper::new("GET", "^/health").expect("skipper")],
            ..authz
        };
        let decision = authz
            .authorize_api(&Identity::admin(1, "root"), "DELETE", "/apis/core/v1/groups/404")
            .await;
        assert_eq!(decision, Decision::allow(REASON_ADMIN));

        let decision = authz
            .authorize_api(&Identity::user(99, "u99"), "GET", "/apis/core/v1/health")
            .await;
        assert_eq!(decision, Decision::allow(REASON_NOT_CHECKED));
    }
}

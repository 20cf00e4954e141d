//! Membership resolver.
//!
//! # Purpose
//! Resolves which role bindings apply to a resource, directly or inherited
//! from its ancestors, and guards binding mutations against privilege
//! escalation.
//!
//! # Key invariants
//! - Effective members are collected leaf to root and deduplicated by
//!   `(member_type, member_name_id)`; the first (closest) binding wins.
//! - Within one level a user binding is visited before user-group bindings.
//! - A non-admin caller can only grant, change or remove roles that rank
//!   equal to or below their own effective role on the resource.
//!
//! # Resolution strategies
//! Each [`ResourceType`] walks to its owning group and then up the group
//! ancestry. Pipeline runs carry no bindings of their own and resolve through
//! their cluster.
use crate::auth::principal::Identity;
use crate::error::{Error, Result};
use crate::model::{Member, MemberType, PageQuery, PageResult, PostMember, ResourceType, is_root};
use crate::store::{ControlPlaneStore, MemberStore, ResourceStore, StoreError};
use crate::tree::GroupService;
use futures::future::try_join_all;
use horizon_rbac::RoleCatalog;
use std::collections::HashSet;
use std::sync::Arc;

type Level = (ResourceType, u64);

#[derive(Clone)]
pub struct MemberService {
    store: Arc<dyn ControlPlaneStore>,
    groups: GroupService,
    catalog: Arc<RoleCatalog>,
}

impl MemberService {
    pub fn new(store: Arc<dyn ControlPlaneStore>, catalog: Arc<RoleCatalog>) -> Self {
        Self {
            groups: GroupService::new(store.clone()),
            store,
            catalog,
        }
    }

    /// Binding levels for a resource, closest first.
    async fn levels(&self, resource_type: ResourceType, resource_id: u64) -> Result<Vec<Level>> {
        let mut levels = Vec::new();
        let group_id = match resource_type {
            ResourceType::Group => resource_id,
            ResourceType::Application => {
                let app = self.store.get_application(resource_id).await?;
                levels.push((ResourceType::Application, app.id));
                app.group_id
            }
            ResourceType::Cluster => {
                let cluster = self.store.get_cluster(resource_id).await?;
                let app = self.store.get_application(cluster.application_id).await?;
                levels.push((ResourceType::Cluster, cluster.id));
                levels.push((ResourceType::Application, app.id));
                app.group_id
            }
            ResourceType::Template => {
                let template = self.store.get_template(resource_id).await?;
                levels.push((ResourceType::Template, template.id));
                template.group_id
            }
            ResourceType::PipelineRun => {
                let run = self.store.get_pipelinerun(resource_id).await?;
                let cluster = self.store.get_cluster(run.cluster_id).await?;
                let app = self.store.get_application(cluster.application_id).await?;
                levels.push((ResourceType::Cluster, cluster.id));
                levels.push((ResourceType::Application, app.id));
                app.group_id
            }
        };
        if !is_root(group_id) {
            let ancestors = self.groups.get_ancestors(group_id).await?;
            levels.extend(
                ancestors
                    .iter()
                    .rev()
                    .map(|group| (ResourceType::Group, group.id)),
            );
        }
        Ok(levels)
    }

    pub async fn direct_member(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
        member_type: MemberType,
        member_name_id: u64,
    ) -> Result<Option<Member>> {
        Ok(self
            .store
            .get_direct_member(resource_type, resource_id, member_type, member_name_id)
            .await?)
    }

    /// Bindings on the resource and every ancestor, most specific first.
    pub async fn effective_members(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
    ) -> Result<Vec<Member>> {
        let levels = self.levels(resource_type, resource_id).await?;
        let per_level = try_join_all(
            levels
                .iter()
                .map(|(rt, rid)| self.store.list_direct_members(*rt, *rid)),
        )
        .await?;

        let mut seen = HashSet::new();
        let mut effective = Vec::new();
        for mut members in per_level {
            members.sort_by_key(|m| (m.member_type, m.id));
            for member in members {
                if seen.insert(member.identity_key()) {
                    effective.push(member);
                }
            }
        }
        Ok(effective)
    }

    pub async fn effective_member_of(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
        member_type: MemberType,
        member_name_id: u64,
    ) -> Result<Option<Member>> {
        Ok(self
            .effective_members(resource_type, resource_id)
            .await?
            .into_iter()
            .find(|m| m.identity_key() == (member_type, member_name_id)))
    }

    /// The closest binding that applies to `caller`, through the caller's own
    /// id or one of its user groups.
    pub async fn get_member_of_resource(
        &self,
        caller: &Identity,
        resource_type: ResourceType,
        resource_id: u64,
    ) -> Result<Option<Member>> {
        Ok(self
            .effective_members(resource_type, resource_id)
            .await?
            .into_iter()
            .find(|m| caller.is_bound_by(m)))
    }

    pub async fn list_member(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
        page: PageQuery,
    ) -> Result<PageResult<Member>> {
        let members = self.effective_members(resource_type, resource_id).await?;
        Ok(page.paginate(members))
    }

    /// Creates a binding, or changes the role of an existing direct binding
    /// for the same identity in place.
    pub async fn create_member(&self, caller: &Identity, post: PostMember) -> Result<Member> {
        if !post.resource_type.accepts_bindings() {
            return Err(Error::InvalidParam(format!(
                "{} do not accept role bindings",
                post.resource_type
            )));
        }
        self.catalog.get_role(&post.role)?;
        let acting = self
            .acting_role(caller, post.resource_type, post.resource_id)
            .await?;
        self.ensure_rank(acting.as_deref(), &post.role, Error::GrantHigherRole)?;

        let existing = self
            .store
            .get_direct_member(
                post.resource_type,
                post.resource_id,
                post.member_type,
                post.member_name_id,
            )
            .await?;
        if let Some(existing) = existing {
            if existing.role == post.role {
                return Ok(existing);
            }
            self.ensure_rank(acting.as_deref(), &existing.role, Error::RemoveHigherRole)?;
            let updated = self
                .store
                .update_member(existing.id, &post.role, caller.id)
                .await?;
            tracing::info!(
                member_id = updated.id,
                from = %existing.role,
                to = %updated.role,
                granted_by = caller.id,
                "existing binding updated in place"
            );
            return Ok(updated);
        }

        let created = self
            .store
            .create_member(post, caller.id)
            .await
            .map_err(|err| match err {
                StoreError::Conflict(msg) => Error::MemberExist(msg),
                other => other.into(),
            })?;
        tracing::info!(
            member_id = created.id,
            member = %created.base_info(),
            granted_by = caller.id,
            "member created"
        );
        Ok(created)
    }

    pub async fn update_member(
        &self,
        caller: &Identity,
        member_id: u64,
        role: &str,
    ) -> Result<Member> {
        let member = self.existing_member(member_id).await?;
        self.catalog.get_role(role)?;
        let acting = self
            .acting_role(caller, member.resource_type, member.resource_id)
            .await?;
        self.ensure_rank(acting.as_deref(), role, Error::GrantHigherRole)?;
        self.ensure_rank(acting.as_deref(), &member.role, Error::RemoveHigherRole)?;

        let updated = self.store.update_member(member_id, role, caller.id).await?;
        tracing::info!(
            member_id,
            from = %member.role,
            to = %updated.role,
            granted_by = caller.id,
            "member updated"
        );
        Ok(updated)
    }

    pub async fn remove_member(&self, caller: &Identity, member_id: u64) -> Result<()> {
        let member = self.existing_member(member_id).await?;
        let acting = self
            .acting_role(caller, member.resource_type, member.resource_id)
            .await?;
        self.ensure_rank(acting.as_deref(), &member.role, Error::RemoveHigherRole)?;

        self.store.delete_member(member_id).await.map_err(|err| match err {
            StoreError::NotFound(msg) => Error::MemberNotExist(msg),
            other => other.into(),
        })?;
        tracing::info!(member = %member.base_info(), removed_by = caller.id, "member removed");
        Ok(())
    }

    async fn existing_member(&self, member_id: u64) -> Result<Member> {
        self.store.get_member(member_id).await.map_err(|err| match err {
            StoreError::NotFound(msg) => Error::MemberNotExist(msg),
            other => other.into(),
        })
    }

    /// The caller's effective role on the resource; `None` for admins.
    async fn acting_role(
        &self,
        caller: &Identity,
        resource_type: ResourceType,
        resource_id: u64,
    ) -> Result<Option<String>> {
        // Resolve the chain even for admins so a missing resource is NotFound.
        let member = self
            .get_member_of_resource(caller, resource_type, resource_id)
            .await?;
        if caller.is_admin {
            return Ok(None);
        }
        match member {
            Some(member) => Ok(Some(member.role)),
            None => {
                tracing::warn!(
                    caller = caller.id,
                    resource = %format!("{resource_type}/{resource_id}"),
                    "caller has no binding on resource"
                );
                Err(Error::NotPermitted(format!(
                    "user {} has no role on {resource_type}/{resource_id}",
                    caller.id
                )))
            }
        }
    }

    fn ensure_rank(
        &self,
        acting: Option<&str>,
        target: &str,
        deny: fn(String) -> Error,
    ) -> Result<()> {
        let Some(acting) = acting else {
            return Ok(());
        };
        if self.catalog.compare(acting, target).is_equal_or_bigger() {
            Ok(())
        } else {
            Err(deny(format!("{acting} cannot act on {target}")))
        }
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use controlplane::app::AppState;
use controlplane::auth::rbac::DEFAULT_ROLES;
use controlplane::config::ControlPlaneConfig;
use controlplane::model::{
    Application, Cluster, Group, GroupPatch, Member, MemberType, NewApplication, NewCluster,
    NewGroup, NewPipelineRun, NewTemplate, PipelineRun, PostMember, ResourceType, Template,
};
use controlplane::store::memory::InMemoryStore;
use controlplane::store::{ControlPlaneStore, MemberStore, ResourceStore, StoreError, StoreResult};
use horizon_rbac::RoleCatalog;
use std::sync::Arc;

pub fn core_with_store(store: Arc<dyn ControlPlaneStore>) -> AppState {
    let catalog = Arc::new(RoleCatalog::from_yaml_str(DEFAULT_ROLES).expect("roles"));
    AppState::from_parts(ControlPlaneConfig::default(), catalog, store).expect("state")
}

pub fn core() -> AppState {
    core_with_store(Arc::new(InMemoryStore::new()))
}

pub async fn group(state: &AppState, name: &str, parent_id: u64) -> Group {
    state
        .groups
        .create_group(NewGroup {
            name: name.to_string(),
            path: name.to_string(),
            description: String::new(),
            parent_id,
            created_by: 1,
        })
        .await
        .expect("create group")
}

/// Seed a user binding directly in the store, bypassing escalation guards.
pub async fn bind(state: &AppState, group_id: u64, user: u64, role: &str) -> Member {
    state
        .store
        .create_member(
            PostMember {
                resource_type: ResourceType::Group,
                resource_id: group_id,
                member_type: MemberType::User,
                member_name_id: user,
                role: role.to_string(),
            },
            0,
        )
        .await
        .expect("seed binding")
}

/// Delegates to an [`InMemoryStore`] while hiding its atomic subtree rewrite
/// and, when asked, failing every binding read.
pub struct FaultyStore {
    inner: InMemoryStore,
    atomic: bool,
    fail_member_reads: bool,
}

impl FaultyStore {
    pub fn non_atomic() -> Self {
        Self {
            inner: InMemoryStore::new(),
            atomic: false,
            fail_member_reads: false,
        }
    }

    pub fn failing_member_reads() -> Self {
        Self {
            inner: InMemoryStore::new(),
            atomic: true,
            fail_member_reads: true,
        }
    }

    fn member_reads(&self) -> StoreResult<()> {
        if self.fail_member_reads {
            return Err(StoreError::Unexpected(anyhow::anyhow!(
                "member table unavailable"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for FaultyStore {
    async fn create_group(&self, group: NewGroup) -> StoreResult<Group> {
        self.inner.create_group(group).await
    }
    async fn get_group(&self, id: u64) -> StoreResult<Group> {
        self.inner.get_group(id).await
    }
    async fn get_groups_by_ids(&self, ids: &[u64]) -> StoreResult<Vec<Group>> {
        self.inner.get_groups_by_ids(ids).await
    }
    async fn get_groups_by_paths(&self, paths: &[String]) -> StoreResult<Vec<Group>> {
        self.inner.get_groups_by_paths(paths).await
    }
    async fn update_group(&self, id: u64, patch: GroupPatch) -> StoreResult<Group> {
        self.inner.update_group(id, patch).await
    }
    async fn delete_group(&self, id: u64) -> StoreResult<()> {
        self.inner.delete_group(id).await
    }
    async fn list_child_groups(&self, parent_id: u64) -> StoreResult<Vec<Group>> {
        self.inner.list_child_groups(parent_id).await
    }
    async fn transfer_group(
        &self,
        id: u64,
        new_parent_id: u64,
        updated_by: u64,
    ) -> StoreResult<Group> {
        self.inner.transfer_group(id, new_parent_id, updated_by).await
    }
    async fn search_groups(&self, filter: &str) -> StoreResult<Vec<Group>> {
        self.inner.search_groups(filter).await
    }
    async fn create_application(&self, application: NewApplication) -> StoreResult<Application> {
        self.inner.create_application(application).await
    }
    async fn get_application(&self, id: u64) -> StoreResult<Application> {
        self.inner.get_application(id).await
    }
    async fn list_applications(&self, group_id: u64) -> StoreResult<Vec<Application>> {
        self.inner.list_applications(group_id).await
    }
    async fn delete_application(&self, id: u64) -> StoreResult<()> {
        self.inner.delete_application(id).await
    }
    async fn create_cluster(&self, cluster: NewCluster) -> StoreResult<Cluster> {
        self.inner.create_cluster(cluster).await
    }
    async fn get_cluster(&self, id: u64) -> StoreResult<Cluster> {
        self.inner.get_cluster(id).await
    }
    async fn create_template(&self, template: NewTemplate) -> StoreResult<Template> {
        self.inner.create_template(template).await
    }
    async fn get_template(&self, id: u64) -> StoreResult<Template> {
        self.inner.get_template(id).await
    }
    async fn create_pipelinerun(&self, run: NewPipelineRun) -> StoreResult<PipelineRun> {
        self.inner.create_pipelinerun(run).await
    }
    async fn get_pipelinerun(&self, id: u64) -> StoreResult<PipelineRun> {
        self.inner.get_pipelinerun(id).await
    }
    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
    fn is_durable(&self) -> bool {
        false
    }
    fn backend_name(&self) -> &'static str {
        "faulty"
    }
    fn atomic_subtree_rewrite(&self) -> bool {
        self.atomic
    }
}

#[async_trait]
impl MemberStore for FaultyStore {
    async fn create_member(&self, member: PostMember, granted_by: u64) -> StoreResult<Member> {
        self.inner.create_member(member, granted_by).await
    }
    async fn get_member(&self, id: u64) -> StoreResult<Member> {
        self.inner.get_member(id).await
    }
    async fn get_direct_member(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
        member_type: MemberType,
        member_name_id: u64,
    ) -> StoreResult<Option<Member>> {
        self.member_reads()?;
        self.inner
            .get_direct_member(resource_type, resource_id, member_type, member_name_id)
            .await
    }
    async fn update_member(&self, id: u64, role: &str, granted_by: u64) -> StoreResult<Member> {
        self.inner.update_member(id, role, granted_by).await
    }
    async fn delete_member(&self, id: u64) -> StoreResult<()> {
        self.inner.delete_member(id).await
    }
    async fn list_direct_members(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
    ) -> StoreResult<Vec<Member>> {
        self.member_reads()?;
        self.inner.list_direct_members(resource_type, resource_id).await
    }
}

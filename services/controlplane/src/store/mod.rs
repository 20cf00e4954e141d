use crate::model::{
    Application, Cluster, Group, GroupPatch, Member, MemberType, NewApplication, NewCluster,
    NewGroup, NewPipelineRun, NewTemplate, PipelineRun, PostMember, ResourceType, Template,
};
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("name conflict: {0}")]
    NameConflict(String),
    #[error("path conflict: {0}")]
    PathConflict(String),
    #[error("group conflicts with application: {0}")]
    GroupConflictWithApplication(String),
    #[error("has children: {0}")]
    HasChildren(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid: {0}")]
    Invalid(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for the group tree and the leaf resources attached to it.
///
/// Implementations must run the uniqueness checks of `create_group`,
/// `update_group` and `transfer_group` in the same transaction as the write,
/// and must rewrite the traversal ids of a transferred subtree all-or-nothing.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn create_group(&self, group: NewGroup) -> StoreResult<Group>;
    async fn get_group(&self, id: u64) -> StoreResult<Group>;
    /// Groups in the order of `ids`; unknown ids are skipped.
    async fn get_groups_by_ids(&self, ids: &[u64]) -> StoreResult<Vec<Group>>;
    async fn get_groups_by_paths(&self, paths: &[String]) -> StoreResult<Vec<Group>>;
    async fn update_group(&self, id: u64, patch: GroupPatch) -> StoreResult<Group>;
    /// Rejects with `HasChildren` instead of cascading.
    async fn delete_group(&self, id: u64) -> StoreResult<()>;
    async fn list_child_groups(&self, parent_id: u64) -> StoreResult<Vec<Group>>;
    async fn transfer_group(&self, id: u64, new_parent_id: u64, updated_by: u64)
    -> StoreResult<Group>;
    async fn search_groups(&self, filter: &str) -> StoreResult<Vec<Group>>;

    async fn create_application(&self, application: NewApplication) -> StoreResult<Application>;
    async fn get_application(&self, id: u64) -> StoreResult<Application>;
    async fn list_applications(&self, group_id: u64) -> StoreResult<Vec<Application>>;
    async fn delete_application(&self, id: u64) -> StoreResult<()>;

    async fn create_cluster(&self, cluster: NewCluster) -> StoreResult<Cluster>;
    async fn get_cluster(&self, id: u64) -> StoreResult<Cluster>;

    async fn create_template(&self, template: NewTemplate) -> StoreResult<Template>;
    async fn get_template(&self, id: u64) -> StoreResult<Template>;

    async fn create_pipelinerun(&self, run: NewPipelineRun) -> StoreResult<PipelineRun>;
    async fn get_pipelinerun(&self, id: u64) -> StoreResult<PipelineRun>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;

    /// Whether `transfer_group` commits the parent change and every
    /// descendant rewrite as one unit. Transfers are refused otherwise.
    fn atomic_subtree_rewrite(&self) -> bool {
        false
    }
}

/// Persistence for role bindings.
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Fails with `Conflict` if the identity already has a direct binding on
    /// the resource.
    async fn create_member(&self, member: PostMember, granted_by: u64) -> StoreResult<Member>;
    async fn get_member(&self, id: u64) -> StoreResult<Member>;
    async fn get_direct_member(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
        member_type: MemberType,
        member_name_id: u64,
    ) -> StoreResult<Option<Member>>;
    async fn update_member(&self, id: u64, role: &str, granted_by: u64) -> StoreResult<Member>;
    async fn delete_member(&self, id: u64) -> StoreResult<()>;
    async fn list_direct_members(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
    ) -> StoreResult<Vec<Member>>;
}

pub trait ControlPlaneStore: ResourceStore + MemberStore {}

impl<T: ResourceStore + MemberStore + ?Sized> ControlPlaneStore for T {}

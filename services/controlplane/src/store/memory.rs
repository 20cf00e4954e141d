//! In-memory implementation of the control-plane store.
//!
//! # Purpose
//! This store implements [`ResourceStore`] and [`MemberStore`] entirely in
//! memory. It exists for:
//! - local development and tests (no external dependencies)
//! - embedding the core where durability is handled elsewhere
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - The whole resource tree (groups plus leaf resources) lives behind a single
//!   `tokio::sync::RwLock`. Every mutation takes the write lock once, runs its
//!   validation reads, then writes. Two concurrent creates under one parent
//!   therefore cannot both pass the uniqueness check.
//! - Bindings live behind a second lock. When both are needed the tree lock is
//!   always taken first.
//!
//! # Materialized paths
//! Groups are addressed by stable id in an arena (`BTreeMap<u64, Group>`) with
//! a parent -> children index. `traversal_ids` is treated as a cache of the
//! parent-pointer graph: a transfer rewrites the parent pointer, then
//! re-derives the traversal ids of the whole subtree from the index. The new
//! values are computed before anything is written, so the apply step cannot
//! fail half way.
//!
//! # Metrics
//! Updates `horizon_groups_total` and the group/member change counters.
use super::{MemberStore, ResourceStore, StoreError, StoreResult};
use crate::model::{
    Application, Cluster, Group, GroupPatch, Member, MemberType, NewApplication, NewCluster,
    NewGroup, NewPipelineRun, NewTemplate, PipelineRun, PostMember, ResourceType, Template,
    is_root,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct IdSequence(u64);

impl IdSequence {
    fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

/// Arena of groups and leaf resources guarded as one unit.
#[derive(Debug, Default)]
struct ResourceTree {
    group_ids: IdSequence,
    application_ids: IdSequence,
    cluster_ids: IdSequence,
    template_ids: IdSequence,
    pipelinerun_ids: IdSequence,
    groups: BTreeMap<u64, Group>,
    /// Parent id -> child group ids. The root sentinel is key `0`.
    children: BTreeMap<u64, BTreeSet<u64>>,
    applications: BTreeMap<u64, Application>,
    clusters: BTreeMap<u64, Cluster>,
    templates: BTreeMap<u64, Template>,
    pipelineruns: BTreeMap<u64, PipelineRun>,
}

impl ResourceTree {
    fn group(&self, id: u64) -> StoreResult<&Group> {
        self.groups
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("group {id}")))
    }

    fn parent_traversal_ids(&self, parent_id: u64) -> StoreResult<Vec<u64>> {
        if is_root(parent_id) {
            return Ok(Vec::new());
        }
        self.groups
            .get(&parent_id)
            .map(|parent| parent.traversal_ids.clone())
            .ok_or_else(|| StoreError::NotFound(format!("parent group {parent_id}")))
    }

    /// Sibling name/path uniqueness, including leaf applications under the
    /// same parent. `exclude` skips the group being updated or moved.
    fn check_sibling_conflicts(
        &self,
        parent_id: u64,
        name: &str,
        path: &str,
        exclude: Option<u64>,
    ) -> StoreResult<()> {
        if let Some(siblings) = self.children.get(&parent_id) {
            for sibling in siblings.iter().filter(|id| Some(**id) != exclude) {
                let Some(group) = self.groups.get(sibling) else {
                    continue;
                };
                if group.name == name {
                    return Err(StoreError::NameConflict(format!(
                        "group name {name} already used under parent {parent_id}"
                    )));
                }
                if group.path == path {
                    return Err(StoreError::PathConflict(format!(
                        "group path {path} already used under parent {parent_id}"
                    )));
                }
            }
        }
        if self
            .applications
            .values()
            .any(|app| app.group_id == parent_id && (app.name == name || app.name == path))
        {
            return Err(StoreError::GroupConflictWithApplication(format!(
                "an application named {name} or {path} exists under parent {parent_id}"
            )));
        }
        Ok(())
    }

    fn group_has_children(&self, id: u64) -> bool {
        self.children.get(&id).is_some_and(|c| !c.is_empty())
            || self.applications.values().any(|app| app.group_id == id)
            || self.templates.values().any(|t| t.group_id == id)
    }

    /// Traversal ids for `id` and every descendant, derived from the
    /// parent -> children index with `prefix` as the new ancestor chain.
    fn derive_subtree_traversal_ids(&self, id: u64, prefix: Vec<u64>) -> Vec<(u64, Vec<u64>)> {
        let mut derived = Vec::new();
        let mut stack = vec![(id, prefix)];
        while let Some((node, mut ids)) = stack.pop() {
            ids.push(node);
            if let Some(children) = self.children.get(&node) {
                for child in children {
                    stack.push((*child, ids.clone()));
                }
            }
            derived.push((node, ids));
        }
        derived
    }

    fn record_group_count(&self) {
        metrics::gauge!("horizon_groups_total").set(self.groups.len() as f64);
    }
}

#[derive(Debug, Default)]
struct MemberTable {
    ids: IdSequence,
    members: BTreeMap<u64, Member>,
}

impl MemberTable {
    fn purge_resource(&mut self, resource_type: ResourceType, resource_id: u64) -> usize {
        let before = self.members.len();
        self.members
            .retain(|_, m| !(m.resource_type == resource_type && m.resource_id == resource_id));
        before - self.members.len()
    }
}

/// In-memory control-plane store.
///
/// Cloning shares the underlying state, so one store can be handed to every
/// service that needs it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tree: Arc<RwLock<ResourceTree>>,
    members: Arc<RwLock<MemberTable>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn create_group(&self, group: NewGroup) -> StoreResult<Group> {
        let mut tree = self.tree.write().await;
        let prefix = tree.parent_traversal_ids(group.parent_id)?;
        tree.check_sibling_conflicts(group.parent_id, &group.name, &group.path, None)?;

        let id = tree.group_ids.next();
        let mut traversal_ids = prefix;
        traversal_ids.push(id);
        let now = Utc::now();
        let created = Group {
            id,
            name: group.name,
            path: group.path,
            description: group.description,
            parent_id: group.parent_id,
            traversal_ids,
            created_by: group.created_by,
            updated_by: group.created_by,
            created_at: now,
            updated_at: now,
        };
        tree.children.entry(created.parent_id).or_default().insert(id);
        tree.groups.insert(id, created.clone());
        metrics::counter!("horizon_group_changes_total", "op" => "created").increment(1);
        tree.record_group_count();
        Ok(created)
    }

    async fn get_group(&self, id: u64) -> StoreResult<Group> {
        self.tree.read().await.group(id).cloned()
    }

    async fn get_groups_by_ids(&self, ids: &[u64]) -> StoreResult<Vec<Group>> {
        let tree = self.tree.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tree.groups.get(id).cloned())
            .collect())
    }

    async fn get_groups_by_paths(&self, paths: &[String]) -> StoreResult<Vec<Group>> {
        let tree = self.tree.read().await;
        Ok(tree
            .groups
            .values()
            .filter(|group| paths.iter().any(|path| *path == group.path))
            .cloned()
            .collect())
    }

    async fn update_group(&self, id: u64, patch: GroupPatch) -> StoreResult<Group> {
        let mut tree = self.tree.write().await;
        let current = tree.group(id)?.clone();
        let name = patch.name.unwrap_or(current.name);
        let path = patch.path.unwrap_or(current.path);
        tree.check_sibling_conflicts(current.parent_id, &name, &path, Some(id))?;

        let group = tree
            .groups
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("group {id}")))?;
        group.name = name;
        group.path = path;
        if let Some(description) = patch.description {
            group.description = description;
        }
        group.updated_by = patch.updated_by;
        group.updated_at = Utc::now();
        let updated = group.clone();
        metrics::counter!("horizon_group_changes_total", "op" => "updated").increment(1);
        Ok(updated)
    }

    async fn delete_group(&self, id: u64) -> StoreResult<()> {
        let mut tree = self.tree.write().await;
        let parent_id = tree.group(id)?.parent_id;
        if tree.group_has_children(id) {
            return Err(StoreError::HasChildren(format!(
                "group {id} still has sub-groups or resources"
            )));
        }
        tree.groups.remove(&id);
        tree.children.remove(&id);
        if let Some(siblings) = tree.children.get_mut(&parent_id) {
            siblings.remove(&id);
        }
        metrics::counter!("horizon_group_changes_total", "op" => "deleted").increment(1);
        tree.record_group_count();

        // Bindings on a deleted node are unreachable; drop them with it.
        let purged = self
            .members
            .write()
            .await
            .purge_resource(ResourceType::Group, id);
        drop(tree);
        if purged > 0 {
            tracing::debug!(group_id = id, purged, "removed bindings of deleted group");
        }
        Ok(())
    }

    async fn list_child_groups(&self, parent_id: u64) -> StoreResult<Vec<Group>> {
        let tree = self.tree.read().await;
        Ok(tree
            .children
            .get(&parent_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| tree.groups.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn transfer_group(
        &self,
        id: u64,
        new_parent_id: u64,
        updated_by: u64,
    ) -> StoreResult<Group> {
        let mut tree = self.tree.write().await;
        let current = tree.group(id)?.clone();
        let prefix = tree.parent_traversal_ids(new_parent_id)?;
        if new_parent_id == id || prefix.contains(&id) {
            return Err(StoreError::Invalid(format!(
                "cannot transfer group {id} under itself or its descendant {new_parent_id}"
            )));
        }
        tree.check_sibling_conflicts(new_parent_id, &current.name, &current.path, Some(id))?;

        // Re-point the parent, then re-derive the subtree from the index.
        if let Some(siblings) = tree.children.get_mut(&current.parent_id) {
            siblings.remove(&id);
        }
        tree.children.entry(new_parent_id).or_default().insert(id);
        let rewrites = tree.derive_subtree_traversal_ids(id, prefix);

        let now = Utc::now();
        for (node, traversal_ids) in &rewrites {
            if let Some(group) = tree.groups.get_mut(node) {
                group.traversal_ids = traversal_ids.clone();
                group.updated_at = now;
            }
        }
        let moved = tree
            .groups
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("group {id}")))?;
        moved.parent_id = new_parent_id;
        moved.updated_by = updated_by;
        let moved = moved.clone();

        metrics::counter!("horizon_group_changes_total", "op" => "transferred").increment(1);
        tracing::debug!(
            group_id = id,
            from = current.parent_id,
            to = new_parent_id,
            rewritten = rewrites.len(),
            "group subtree transferred"
        );
        Ok(moved)
    }

    async fn search_groups(&self, filter: &str) -> StoreResult<Vec<Group>> {
        let needle = filter.to_lowercase();
        let tree = self.tree.read().await;
        Ok(tree
            .groups
            .values()
            .filter(|group| group.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn create_application(&self, application: NewApplication) -> StoreResult<Application> {
        let mut tree = self.tree.write().await;
        if is_root(application.group_id) {
            return Err(StoreError::Invalid(
                "applications must belong to a group".to_string(),
            ));
        }
        tree.group(application.group_id)?;
        if tree
            .applications
            .values()
            .any(|app| app.name == application.name)
        {
            return Err(StoreError::Conflict(format!(
                "application {} exists",
                application.name
            )));
        }
        let sibling_clash = tree.children.get(&application.group_id).is_some_and(|ids| {
            ids.iter().filter_map(|id| tree.groups.get(id)).any(|group| {
                group.name == application.name || group.path == application.name
            })
        });
        if sibling_clash {
            return Err(StoreError::GroupConflictWithApplication(format!(
                "a group named {} exists under group {}",
                application.name, application.group_id
            )));
        }

        let now = Utc::now();
        let created = Application {
            id: tree.application_ids.next(),
            name: application.name,
            description: application.description,
            group_id: application.group_id,
            created_by: application.created_by,
            created_at: now,
            updated_at: now,
        };
        tree.applications.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_application(&self, id: u64) -> StoreResult<Application> {
        self.tree
            .read()
            .await
            .applications
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("application {id}")))
    }

    async fn list_applications(&self, group_id: u64) -> StoreResult<Vec<Application>> {
        Ok(self
            .tree
            .read()
            .await
            .applications
            .values()
            .filter(|app| app.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn delete_application(&self, id: u64) -> StoreResult<()> {
        let mut tree = self.tree.write().await;
        if !tree.applications.contains_key(&id) {
            return Err(StoreError::NotFound(format!("application {id}")));
        }
        if tree.clusters.values().any(|c| c.application_id == id) {
            return Err(StoreError::HasChildren(format!(
                "application {id} still has clusters"
            )));
        }
        tree.applications.remove(&id);
        self.members
            .write()
            .await
            .purge_resource(ResourceType::Application, id);
        Ok(())
    }

    async fn create_cluster(&self, cluster: NewCluster) -> StoreResult<Cluster> {
        let mut tree = self.tree.write().await;
        if !tree.applications.contains_key(&cluster.application_id) {
            return Err(StoreError::NotFound(format!(
                "application {}",
                cluster.application_id
            )));
        }
        if tree
            .clusters
            .values()
            .any(|c| c.application_id == cluster.application_id && c.name == cluster.name)
        {
            return Err(StoreError::Conflict(format!(
                "cluster {} exists",
                cluster.name
            )));
        }
        let created = Cluster {
            id: tree.cluster_ids.next(),
            name: cluster.name,
            application_id: cluster.application_id,
            created_by: cluster.created_by,
            created_at: Utc::now(),
        };
        tree.clusters.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_cluster(&self, id: u64) -> StoreResult<Cluster> {
        self.tree
            .read()
            .await
            .clusters
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("cluster {id}")))
    }

    async fn create_template(&self, template: NewTemplate) -> StoreResult<Template> {
        let mut tree = self.tree.write().await;
        if !is_root(template.group_id) {
            tree.group(template.group_id)?;
        }
        if tree.templates.values().any(|t| t.name == template.name) {
            return Err(StoreError::Conflict(format!(
                "template {} exists",
                template.name
            )));
        }
        let created = Template {
            id: tree.template_ids.next(),
            name: template.name,
            group_id: template.group_id,
            created_by: template.created_by,
            created_at: Utc::now(),
        };
        tree.templates.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_template(&self, id: u64) -> StoreResult<Template> {
        self.tree
            .read()
            .await
            .templates
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("template {id}")))
    }

    async fn create_pipelinerun(&self, run: NewPipelineRun) -> StoreResult<PipelineRun> {
        let mut tree = self.tree.write().await;
        if !tree.clusters.contains_key(&run.cluster_id) {
            return Err(StoreError::NotFound(format!("cluster {}", run.cluster_id)));
        }
        let created = PipelineRun {
            id: tree.pipelinerun_ids.next(),
            cluster_id: run.cluster_id,
            title: run.title,
            created_by: run.created_by,
            created_at: Utc::now(),
        };
        tree.pipelineruns.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_pipelinerun(&self, id: u64) -> StoreResult<PipelineRun> {
        self.tree
            .read()
            .await
            .pipelineruns
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("pipelinerun {id}")))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn atomic_subtree_rewrite(&self) -> bool {
        // Transfers run entirely under the tree write lock.
        true
    }
}

#[async_trait]
impl MemberStore for InMemoryStore {
    async fn create_member(&self, member: PostMember, granted_by: u64) -> StoreResult<Member> {
        let mut table = self.members.write().await;
        let exists = table.members.values().any(|m| {
            m.resource_type == member.resource_type
                && m.resource_id == member.resource_id
                && m.member_type == member.member_type
                && m.member_name_id == member.member_name_id
        });
        if exists {
            return Err(StoreError::Conflict("member exists".into()));
        }
        let now = Utc::now();
        let created = Member {
            id: table.ids.next(),
            resource_type: member.resource_type,
            resource_id: member.resource_id,
            role: member.role,
            member_type: member.member_type,
            member_name_id: member.member_name_id,
            granted_by,
            created_by: granted_by,
            created_at: now,
            updated_at: now,
        };
        table.members.insert(created.id, created.clone());
        metrics::counter!("horizon_member_changes_total", "op" => "created").increment(1);
        Ok(created)
    }

    async fn get_member(&self, id: u64) -> StoreResult<Member> {
        self.members
            .read()
            .await
            .members
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("member {id}")))
    }

    async fn get_direct_member(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
        member_type: MemberType,
        member_name_id: u64,
    ) -> StoreResult<Option<Member>> {
        Ok(self
            .members
            .read()
            .await
            .members
            .values()
            .find(|m| {
                m.resource_type == resource_type
                    && m.resource_id == resource_id
                    && m.member_type == member_type
                    && m.member_name_id == member_name_id
            })
            .cloned())
    }

    async fn update_member(&self, id: u64, role: &str, granted_by: u64) -> StoreResult<Member> {
        let mut table = self.members.write().await;
        let member = table
            .members
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("member {id}")))?;
        member.role = role.to_string();
        member.granted_by = granted_by;
        member.updated_at = Utc::now();
        metrics::counter!("horizon_member_changes_total", "op" => "updated").increment(1);
        Ok(member.clone())
    }

    async fn delete_member(&self, id: u64) -> StoreResult<()> {
        if self.members.write().await.members.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("member {id}")));
        }
        metrics::counter!("horizon_member_changes_total", "op" => "deleted").increment(1);
        Ok(())
    }

    async fn list_direct_members(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
    ) -> StoreResult<Vec<Member>> {
        Ok(self
            .members
            .read()
            .await
            .members
            .values()
            .filter(|m| m.resource_type == resource_type && m.resource_id == resource_id)
            .cloned()
            .collect())
    }
}

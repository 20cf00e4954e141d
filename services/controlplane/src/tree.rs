//! Resource tree service.
//!
//! # Purpose
//! Validates and applies group mutations on top of a [`ControlPlaneStore`], and
//! answers the ancestor/path queries the membership resolver and higher-level
//! controllers depend on.
//!
//! # Key invariants
//! - Sibling uniqueness and the parent lookup run inside the store's write
//!   transaction; this layer only validates payload shape.
//! - `traversal_ids` is never edited here; it is derived by the store.
//! - A transfer is refused outright when the backend cannot rewrite a subtree
//!   atomically.
use crate::error::{Error, Result};
use crate::model::{
    Child, Group, GroupDetail, GroupPatch, NewGroup, PageQuery, PageResult, ROOT_GROUP_ID, is_root,
};
use crate::store::{ControlPlaneStore, ResourceStore};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

pub const MAX_NAME_LEN: usize = 128;

static PATH_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("path segment pattern compiles")
});

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidParam(format!(
            "name must be 1 to {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<()> {
    if path.len() > MAX_NAME_LEN || !PATH_SEGMENT.is_match(path) {
        return Err(Error::InvalidParam(format!(
            "path {path:?} must be lowercase alphanumerics and '-'"
        )));
    }
    Ok(())
}

/// Build `full_path`/`full_name` from a root-first ancestor chain ending in
/// the group itself.
fn detail_from_chain(group: Group, chain: &[&Group]) -> GroupDetail {
    let full_path = chain
        .iter()
        .map(|g| g.path.as_str())
        .fold(String::new(), |mut acc, segment| {
            acc.push('/');
            acc.push_str(segment);
            acc
        });
    let full_name = chain
        .iter()
        .map(|g| g.name.as_str())
        .collect::<Vec<_>>()
        .join(" / ");
    GroupDetail {
        group,
        full_path,
        full_name,
    }
}

#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn ControlPlaneStore>,
}

impl GroupService {
    pub fn new(store: Arc<dyn ControlPlaneStore>) -> Self {
        Self { store }
    }

    pub async fn create_group(&self, group: NewGroup) -> Result<Group> {
        validate_name(&group.name)?;
        validate_path(&group.path)?;
        let created = self.store.create_group(group).await?;
        tracing::info!(
            group_id = created.id,
            parent_id = created.parent_id,
            traversal_ids = %created.traversal_ids_string(),
            "group created"
        );
        Ok(created)
    }

    pub async fn update_group_basic(&self, id: u64, patch: GroupPatch) -> Result<Group> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(path) = &patch.path {
            validate_path(path)?;
        }
        let updated = self.store.update_group(id, patch).await?;
        tracing::info!(group_id = id, "group updated");
        Ok(updated)
    }

    /// Rejects with `HasChildren` rather than cascading.
    pub async fn delete_group(&self, id: u64) -> Result<()> {
        if is_root(id) {
            return Err(Error::InvalidParam("the root cannot be deleted".into()));
        }
        self.store.delete_group(id).await?;
        tracing::info!(group_id = id, "group deleted");
        Ok(())
    }

    pub async fn transfer_group(
        &self,
        id: u64,
        new_parent_id: u64,
        updated_by: u64,
    ) -> Result<Group> {
        if is_root(id) {
            return Err(Error::InvalidParam("the root cannot be transferred".into()));
        }
        if !self.store.atomic_subtree_rewrite() {
            tracing::error!(
                backend = self.store.backend_name(),
                "refusing transfer: backend cannot rewrite a subtree atomically"
            );
            return Err(Error::Internal(
                "transfer is not supported by this store backend".into(),
            ));
        }
        let moved = self
            .store
            .transfer_group(id, new_parent_id, updated_by)
            .await?;
        tracing::info!(
            group_id = id,
            new_parent_id,
            traversal_ids = %moved.traversal_ids_string(),
            "group transferred"
        );
        Ok(moved)
    }

    pub async fn get_group(&self, id: u64) -> Result<GroupDetail> {
        let group = self.store.get_group(id).await?;
        let ancestors = self.ancestors_of(&group).await?;
        let chain: Vec<&Group> = ancestors.iter().collect();
        Ok(detail_from_chain(group, &chain))
    }

    /// Ancestor chain of `id`, root first, including the group itself.
    pub async fn get_ancestors(&self, id: u64) -> Result<Vec<Group>> {
        let group = self.store.get_group(id).await?;
        self.ancestors_of(&group).await
    }

    async fn ancestors_of(&self, group: &Group) -> Result<Vec<Group>> {
        let chain = self.store.get_groups_by_ids(&group.traversal_ids).await?;
        if chain.len() != group.traversal_ids.len() {
            tracing::error!(
                group_id = group.id,
                traversal_ids = %group.traversal_ids_string(),
                "ancestor chain is incomplete"
            );
            return Err(Error::Internal(format!(
                "group {} has a dangling ancestor",
                group.id
            )));
        }
        Ok(chain)
    }

    pub async fn get_by_paths(&self, paths: &[String]) -> Result<Vec<Group>> {
        Ok(self.store.get_groups_by_paths(paths).await?)
    }

    /// Resolve a `/`-separated full path such as `/platform/infra`.
    pub async fn get_by_full_path(&self, full_path: &str) -> Result<GroupDetail> {
        let segments: Vec<String> = full_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if segments.is_empty() {
            return Err(Error::InvalidParam("empty group path".into()));
        }
        let candidates = self.store.get_groups_by_paths(&segments).await?;

        let mut chain: Vec<&Group> = Vec::with_capacity(segments.len());
        let mut parent_id = ROOT_GROUP_ID;
        for segment in &segments {
            let next = candidates
                .iter()
                .find(|g| g.parent_id == parent_id && g.path == *segment)
                .ok_or_else(|| Error::NotFound(format!("group {full_path}")))?;
            parent_id = next.id;
            chain.push(next);
        }
        let group = chain
            .last()
            .map(|g| (*g).clone())
            .ok_or_else(|| Error::NotFound(format!("group {full_path}")))?;
        Ok(detail_from_chain(group, &chain))
    }

    /// Sub-groups first, then applications, each in id order.
    pub async fn list_children(
        &self,
        parent_id: u64,
        page: PageQuery,
    ) -> Result<PageResult<Child>> {
        if !is_root(parent_id) {
            self.store.get_group(parent_id).await?;
        }
        let groups = self.store.list_child_groups(parent_id).await?;
        let applications = self.store.list_applications(parent_id).await?;
        let children: Vec<Child> = groups
            .iter()
            .map(Child::from)
            .chain(applications.iter().map(Child::from))
            .collect();
        Ok(page.paginate(children))
    }

    /// Case-insensitive name search restricted to descendants of `parent_id`.
    pub async fn search_children(
        &self,
        parent_id: u64,
        filter: &str,
        page: PageQuery,
    ) -> Result<PageResult<GroupDetail>> {
        if !is_root(parent_id) {
            self.store.get_group(parent_id).await?;
        }
        let matches: Vec<Group> = self
            .store
            .search_groups(filter)
            .await?
            .into_iter()
            .filter(|g| {
                g.id != parent_id && (is_root(parent_id) || g.traversal_ids.contains(&parent_id))
            })
            .collect();

        let page = page.paginate(matches);
        let mut ancestor_ids: Vec<u64> = page
            .items
            .iter()
            .flat_map(|g| g.traversal_ids.iter().copied())
            .collect();
        ancestor_ids.sort_unstable();
        ancestor_ids.dedup();
        let ancestors: HashMap<u64, Group> = self
            .store
            .get_groups_by_ids(&ancestor_ids)
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect();

        let items = page
            .items
            .into_iter()
            .map(|group| {
                let chain: Vec<&Group> = group
                    .traversal_ids
                    .iter()
                    .filter_map(|id| ancestors.get(id))
                    .collect();
                detail_from_chain(group, &chain)
            })
            .collect();
        Ok(PageResult {
            total: page.total,
            items,
        })
    }
}

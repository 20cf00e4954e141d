//! Group (tree node) model definitions.
//!
//! # Purpose
//! Defines the group record, its create/patch payloads, and the child listing
//! shape returned by tree queries.
//!
//! # Key invariants
//! - `traversal_ids` is `traversal_ids(parent) ++ [id]`, root first.
//! - `parent_id == ROOT_GROUP_ID` marks a top-level group; the root itself is
//!   never stored.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ROOT_GROUP_ID: u64 = 0;

/// The root sentinel is an identity check, never a lookup.
pub fn is_root(id: u64) -> bool {
    id == ROOT_GROUP_ID
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub description: String,
    pub parent_id: u64,
    pub traversal_ids: Vec<u64>,
    pub created_by: u64,
    pub updated_by: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Comma-joined materialized path, e.g. `"3,1,2"`.
    pub fn traversal_ids_string(&self) -> String {
        self.traversal_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewGroup {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_id: u64,
    #[serde(default)]
    pub created_by: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub path: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub updated_by: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    /// `/`-joined path segments from the root, e.g. `/platform/infra`.
    pub full_path: String,
    /// ` / `-joined names from the root.
    pub full_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ChildType {
    Group,
    Application,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Child {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub description: String,
    pub parent_id: u64,
    pub child_type: ChildType,
    pub updated_at: DateTime<Utc>,
}

impl From<&Group> for Child {
    fn from(group: &Group) -> Self {
        Child {
            id: group.id,
            name: group.name.clone(),
            path: group.path.clone(),
            description: group.description.clone(),
            parent_id: group.parent_id,
            child_type: ChildType::Group,
            updated_at: group.updated_at,
        }
    }
}

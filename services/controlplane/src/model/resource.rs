//! Leaf resource model definitions.
//!
//! # Purpose
//! Defines the resource kinds bindings can be attached to and the leaf records
//! (applications, clusters, templates, pipeline runs) hung under the group
//! tree.
//!
//! # Ownership chain
//! - Application -> Group
//! - Cluster -> Application
//! - Template -> Group (or root-level when `group_id == 0`)
//! - PipelineRun -> Cluster
use crate::model::{Child, ChildType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// API resource name of the membership-management endpoints.
pub const RESOURCE_MEMBERS: &str = "members";
/// API resource name of the pipeline-run endpoints.
pub const RESOURCE_PIPELINERUNS: &str = "pipelineruns";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Group,
    Application,
    Cluster,
    Template,
    PipelineRun,
}

impl ResourceType {
    /// API (plural) resource name.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Group => "groups",
            ResourceType::Application => "applications",
            ResourceType::Cluster => "clusters",
            ResourceType::Template => "templates",
            ResourceType::PipelineRun => RESOURCE_PIPELINERUNS,
        }
    }

    /// Whether role bindings may be recorded directly on this kind.
    pub fn accepts_bindings(self) -> bool {
        !matches!(self, ResourceType::PipelineRun)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "groups" | "group" => Ok(ResourceType::Group),
            "applications" | "application" => Ok(ResourceType::Application),
            "clusters" | "cluster" => Ok(ResourceType::Cluster),
            "templates" | "template" => Ok(ResourceType::Template),
            "pipelineruns" | "pipelinerun" => Ok(ResourceType::PipelineRun),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub group_id: u64,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Application> for Child {
    fn from(app: &Application) -> Self {
        Child {
            id: app.id,
            name: app.name.clone(),
            // Applications have no separate path segment.
            path: app.name.clone(),
            description: app.description.clone(),
            parent_id: app.group_id,
            child_type: ChildType::Application,
            updated_at: app.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewApplication {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub group_id: u64,
    #[serde(default)]
    pub created_by: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub id: u64,
    pub name: String,
    pub application_id: u64,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewCluster {
    pub name: String,
    pub application_id: u64,
    #[serde(default)]
    pub created_by: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: u64,
    pub name: String,
    pub group_id: u64,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub group_id: u64,
    #[serde(default)]
    pub created_by: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    pub id: u64,
    pub cluster_id: u64,
    pub title: String,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewPipelineRun {
    pub cluster_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_by: u64,
}

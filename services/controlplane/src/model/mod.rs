//! Control-plane data model module.
//!
//! # Purpose
//! Re-exports the resource tree records (groups and the leaf resources hung
//! under them), role bindings, and the paging helpers shared by the store and
//! the services built on top of it.
mod group;
mod member;
mod page;
mod resource;

pub use group::{
    Child, ChildType, Group, GroupDetail, GroupPatch, NewGroup, ROOT_GROUP_ID, is_root,
};
pub use member::{Member, MemberType, PostMember};
pub use page::{PageQuery, PageResult};
pub use resource::{
    Application, Cluster, NewApplication, NewCluster, NewPipelineRun, NewTemplate, PipelineRun,
    RESOURCE_MEMBERS, RESOURCE_PIPELINERUNS, ResourceType, Template,
};

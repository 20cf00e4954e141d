//! Role binding model definitions.
//!
//! # Purpose
//! Defines the binding record that attaches an identity to a role on a
//! resource, and the request payload used to create one.
use crate::model::ResourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    User,
    UserGroup,
}

impl MemberType {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberType::User => "user",
            MemberType::UserGroup => "usergroup",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: u64,
    pub resource_type: ResourceType,
    pub resource_id: u64,
    pub role: String,
    pub member_type: MemberType,
    /// User id or user-group id depending on `member_type`.
    pub member_name_id: u64,
    pub granted_by: u64,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Identity key used for deduplication across the ancestor walk.
    pub fn identity_key(&self) -> (MemberType, u64) {
        (self.member_type, self.member_name_id)
    }

    /// Short human-readable summary used in authorization reasons.
    pub fn base_info(&self) -> String {
        format!(
            "{}/{} role={} {}={}",
            self.resource_type,
            self.resource_id,
            self.role,
            self.member_type.as_str(),
            self.member_name_id
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PostMember {
    pub resource_type: ResourceType,
    pub resource_id: u64,
    pub member_type: MemberType,
    pub member_name_id: u64,
    pub role: String,
}

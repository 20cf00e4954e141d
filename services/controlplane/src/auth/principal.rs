//! Caller identity model.
//!
//! # Purpose
//! Carries the already-authenticated caller into authorization and membership
//! checks. Verifying who the caller is happens upstream of this crate.
use crate::model::{Member, MemberType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: u64,
    pub name: String,
    /// Platform admins bypass rule evaluation and escalation guards.
    #[serde(default)]
    pub is_admin: bool,
    /// User-group ids the caller belongs to.
    #[serde(default)]
    pub user_groups: Vec<u64>,
}

impl Identity {
    pub fn user(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_admin: false,
            user_groups: Vec::new(),
        }
    }

    pub fn admin(id: u64, name: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::user(id, name)
        }
    }

    pub fn with_user_groups(mut self, user_groups: Vec<u64>) -> Self {
        self.user_groups = user_groups;
        self
    }

    /// Whether `member` binds this caller, directly or through a user group.
    pub fn is_bound_by(&self, member: &Member) -> bool {
        match member.member_type {
            MemberType::User => member.member_name_id == self.id,
            MemberType::UserGroup => self.user_groups.contains(&member.member_name_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceType;
    use chrono::Utc;

    fn binding(member_type: MemberType, member_name_id: u64) -> Member {
        let now = Utc::now();
        Member {
            id: 1,
            resource_type: ResourceType::Group,
            resource_id: 1,
            role: "guest".to_string(),
            member_type,
            member_name_id,
            granted_by: 0,
            created_by: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn bound_directly_or_through_user_group() {
        let caller = Identity::user(7, "alice").with_user_groups(vec![40]);
        assert!(caller.is_bound_by(&binding(MemberType::User, 7)));
        assert!(caller.is_bound_by(&binding(MemberType::UserGroup, 40)));
        assert!(!caller.is_bound_by(&binding(MemberType::User, 40)));
        assert!(!caller.is_bound_by(&binding(MemberType::UserGroup, 7)));
    }

    #[test]
    fn admin_constructor_sets_flag() {
        let admin = Identity::admin(1, "root");
        assert!(admin.is_admin);
        assert!(!Identity::user(1, "root").is_admin);
    }
}

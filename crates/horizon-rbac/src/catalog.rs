//! Load-once role catalog.
//!
//! # Purpose and responsibility
//! Holds the named roles and the declared priority ranking used to bound
//! privilege escalation when granting or revoking bindings.
//!
//! # Key invariants
//! - Every role appears exactly once in `RolePriorityRankDesc` and vice versa;
//!   any disagreement fails [`RoleCatalog::load`] with
//!   [`RbacError::LoadCheck`].
//! - A configured default role must name a loaded role.
//! - There is no mutation API after construction; share it behind an `Arc`.
//!
//! # Security considerations
//! - Rank is only consulted by escalation checks. Rule matching never looks at
//!   rank, so a higher-ranked role does not implicitly include the rules of a
//!   lower-ranked one.
use crate::errors::{RbacError, RbacResult};
use crate::types::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Role-definition document as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Role names, highest authority first.
    #[serde(rename = "RolePriorityRankDesc", default)]
    pub role_priority_rank_desc: Vec<String>,
    #[serde(rename = "DefaultRole", default)]
    pub default_role: Option<String>,
    #[serde(rename = "Roles", default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCompare {
    Bigger,
    Smaller,
    Equal,
    Incomparable,
}

impl RoleCompare {
    pub fn is_equal_or_bigger(self) -> bool {
        matches!(self, RoleCompare::Bigger | RoleCompare::Equal)
    }
}

#[derive(Debug, Clone)]
pub struct RoleCatalog {
    roles: Vec<Role>,
    by_name: HashMap<String, usize>,
    rank: HashMap<String, usize>,
    default_role: Option<usize>,
}

impl RoleCatalog {
    pub fn load(definition: RoleDefinition) -> RbacResult<Self> {
        let RoleDefinition {
            role_priority_rank_desc,
            default_role,
            roles,
        } = definition;

        if role_priority_rank_desc.len() != roles.len() {
            return Err(RbacError::LoadCheck(format!(
                "RolePriorityRankDesc has {} entries but {} roles are defined",
                role_priority_rank_desc.len(),
                roles.len()
            )));
        }

        let mut by_name = HashMap::with_capacity(roles.len());
        for (idx, role) in roles.iter().enumerate() {
            if role.name.trim().is_empty() {
                return Err(RbacError::LoadCheck("role with empty name".to_string()));
            }
            if by_name.insert(role.name.clone(), idx).is_some() {
                return Err(RbacError::LoadCheck(format!(
                    "role {} defined more than once",
                    role.name
                )));
            }
        }

        let mut rank = HashMap::with_capacity(role_priority_rank_desc.len());
        for (idx, name) in role_priority_rank_desc.iter().enumerate() {
            if !by_name.contains_key(name) {
                return Err(RbacError::LoadCheck(format!(
                    "ranked role {name} is not defined"
                )));
            }
            if rank.insert(name.clone(), idx).is_some() {
                return Err(RbacError::LoadCheck(format!(
                    "role {name} ranked more than once"
                )));
            }
        }

        let default_role = match default_role.filter(|name| !name.is_empty()) {
            Some(name) => Some(*by_name.get(&name).ok_or_else(|| {
                RbacError::LoadCheck(format!("default role {name} is not defined"))
            })?),
            None => None,
        };

        tracing::info!(
            roles = roles.len(),
            default_role = ?default_role.map(|idx| roles[idx].name.as_str()),
            "role catalog loaded"
        );
        Ok(Self {
            roles,
            by_name,
            rank,
            default_role,
        })
    }

    pub fn from_yaml_str(raw: &str) -> RbacResult<Self> {
        let definition: RoleDefinition = serde_yaml::from_str(raw)?;
        Self::load(definition)
    }

    pub fn from_file(path: impl AsRef<Path>) -> RbacResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RbacError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn get_role(&self, name: &str) -> RbacResult<&Role> {
        self.by_name
            .get(name)
            .map(|idx| &self.roles[*idx])
            .ok_or_else(|| RbacError::RoleNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Compare declared ranks; a lower index in the priority list is `Bigger`.
    pub fn compare(&self, a: &str, b: &str) -> RoleCompare {
        match (self.rank.get(a), self.rank.get(b)) {
            (Some(ra), Some(rb)) if ra < rb => RoleCompare::Bigger,
            (Some(ra), Some(rb)) if ra > rb => RoleCompare::Smaller,
            (Some(_), Some(_)) => RoleCompare::Equal,
            _ => RoleCompare::Incomparable,
        }
    }

    pub fn default_role(&self) -> Option<&Role> {
        self.default_role.map(|idx| &self.roles[idx])
    }

    /// Roles in declaration order.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: &str = r#"
RolePriorityRankDesc:
  - owner
  - maintainer
  - guest
DefaultRole: guest
Roles:
  - name: owner
    rules:
      - verbs: ["*"]
        apiGroups: ["*"]
        resources: ["*"]
        scopes: ["*"]
  - name: maintainer
    rules:
      - verbs: ["get", "update"]
        apiGroups: ["core"]
        resources: ["groups"]
        scopes: ["*"]
  - name: guest
    rules:
      - verbs: ["get"]
        apiGroups: ["core"]
        resources: ["groups"]
        scopes: ["*"]
"#;

    #[test]
    fn loads_and_compares_by_declared_rank() {
        let catalog = RoleCatalog::from_yaml_str(ROLES).expect("catalog");
        assert_eq!(catalog.roles().len(), 3);
        assert_eq!(catalog.compare("owner", "guest"), RoleCompare::Bigger);
        assert_eq!(catalog.compare("guest", "maintainer"), RoleCompare::Smaller);
        assert_eq!(catalog.compare("maintainer", "maintainer"), RoleCompare::Equal);
        assert_eq!(catalog.compare("owner", "nobody"), RoleCompare::Incomparable);
        assert!(RoleCompare::Equal.is_equal_or_bigger());
        assert!(!RoleCompare::Incomparable.is_equal_or_bigger());
    }

    #[test]
    fn lookup_and_default_role() {
        let catalog = RoleCatalog::from_yaml_str(ROLES).expect("catalog");
        assert_eq!(catalog.get_role("maintainer").expect("role").rules.len(), 1);
        assert!(matches!(
            catalog.get_role("admin"),
            Err(RbacError::RoleNotFound(name)) if name == "admin"
        ));
        assert_eq!(catalog.default_role().map(|r| r.name.as_str()), Some("guest"));
    }

    #[test]
    fn rank_size_mismatch_fails_load() {
        let definition = RoleDefinition {
            role_priority_rank_desc: vec!["owner".to_string()],
            default_role: None,
            roles: vec![role("owner"), role("guest")],
        };
        assert!(matches!(
            RoleCatalog::load(definition),
            Err(RbacError::LoadCheck(_))
        ));
    }

    #[test]
    fn rank_content_mismatch_fails_load() {
        let definition = RoleDefinition {
            role_priority_rank_desc: vec!["owner".to_string(), "pe".to_string()],
            default_role: None,
            roles: vec![role("owner"), role("guest")],
        };
        assert!(matches!(
            RoleCatalog::load(definition),
            Err(RbacError::LoadCheck(_))
        ));
    }

    #[test]
    fn duplicate_rank_entry_fails_load() {
        let definition = RoleDefinition {
            role_priority_rank_desc: vec!["owner".to_string(), "owner".to_string()],
            default_role: None,
            roles: vec![role("owner"), role("guest")],
        };
        assert!(matches!(
            RoleCatalog::load(definition),
            Err(RbacError::LoadCheck(_))
        ));
    }

    #[test]
    fn unknown_default_role_fails_load() {
        let definition = RoleDefinition {
            role_priority_rank_desc: vec!["owner".to_string()],
            default_role: Some("guest".to_string()),
            roles: vec![role("owner")],
        };
        assert!(matches!(
            RoleCatalog::load(definition),
            Err(RbacError::LoadCheck(_))
        ));
    }

    #[test]
    fn missing_default_role_is_allowed() {
        let definition = RoleDefinition {
            role_priority_rank_desc: vec!["owner".to_string()],
            default_role: None,
            roles: vec![role("owner")],
        };
        let catalog = RoleCatalog::load(definition).expect("catalog");
        assert!(catalog.default_role().is_none());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(matches!(
            RoleCatalog::from_yaml_str("Roles: [[["),
            Err(RbacError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            RoleCatalog::from_file("/definitely/not/here/roles.yaml"),
            Err(RbacError::Io { .. })
        ));
    }

    fn role(name: &str) -> Role {
        Role {
            name: name.to_string(),
            desc: String::new(),
            rules: Vec::new(),
        }
    }
}

//! Role and policy-rule records.
//!
//! # Purpose
//! Defines the shapes loaded from the role-definition document: a [`Role`] is
//! a named, ordered list of [`PolicyRule`]s.
//!
//! # Key invariants
//! - Roles are immutable once loaded into a [`crate::RoleCatalog`].
//! - Rule order is significant: evaluation stops at the first matching rule.
//!
//! # Examples
//! ```rust
//! use horizon_rbac::{PolicyRule, RequestInfoFactory, Role};
//!
//! let role = Role {
//!     name: "guest".to_string(),
//!     desc: String::new(),
//!     rules: vec![PolicyRule {
//!         verbs: vec!["get".to_string()],
//!         api_groups: vec!["*".to_string()],
//!         resources: vec!["*".to_string()],
//!         scopes: vec!["*".to_string()],
//!         non_resource_urls: vec![],
//!     }],
//! };
//! let info = RequestInfoFactory::default().new_request_info("GET", "/apis/core/v1/groups/1");
//! assert_eq!(role.first_match(&info), Some(0));
//! ```
use crate::matcher::rule_allows;
use crate::request_info::RequestInfo;
use serde::{Deserialize, Serialize};

pub const VERB_ALL: &str = "*";
pub const API_GROUP_ALL: &str = "*";
pub const RESOURCE_ALL: &str = "*";
pub const SCOPE_ALL: &str = "*";
pub const NON_RESOURCE_ALL: &str = "*";

/// Attribute-matching predicate. Within a dimension the entries are OR-ed,
/// across dimensions they are AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub api_groups: Vec<String>,
    /// Resource names, `resource/subresource` pairs, or the `*/subresource` form.
    #[serde(default)]
    pub resources: Vec<String>,
    /// Exact scopes, `*`, or prefix wildcards such as `online/*`.
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, rename = "nonResourceURLs")]
    pub non_resource_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

impl Role {
    /// Index of the first rule that allows `info`, if any.
    pub fn first_match(&self, info: &RequestInfo) -> Option<usize> {
        self.rules.iter().position(|rule| rule_allows(rule, info))
    }
}

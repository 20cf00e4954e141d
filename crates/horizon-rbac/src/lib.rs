//! Horizon role and policy primitives shared by the control-plane core.
//!
//! # Purpose
//! Centralizes the role model (named, ordered policy rules plus a declared
//! priority rank), per-dimension rule matching, and the request attribute
//! parser used to evaluate `(method, url)` pairs against those rules.
//!
//! # How it fits
//! The control plane resolves which role a caller holds on a resource; this
//! crate answers whether that role's rules allow the request and whether one
//! role outranks another.
//!
//! # Key invariants
//! - The role catalog is loaded once and never mutated.
//! - Rules are evaluated in declaration order and the first match wins.
//!
//! # Examples
//! ```rust
//! use horizon_rbac::{RequestInfoFactory, RoleCatalog, RoleCompare};
//!
//! let catalog = RoleCatalog::from_yaml_str(
//!     r#"
//! RolePriorityRankDesc: [owner, guest]
//! DefaultRole: guest
//! Roles:
//!   - name: owner
//!     rules:
//!       - verbs: ["*"]
//!         apiGroups: ["*"]
//!         resources: ["*"]
//!         scopes: ["*"]
//!   - name: guest
//!     rules: []
//! "#,
//! )
//! .expect("catalog");
//! assert_eq!(catalog.compare("owner", "guest"), RoleCompare::Bigger);
//!
//! let info = RequestInfoFactory::default().new_request_info("DELETE", "/apis/core/v1/groups/7");
//! let owner = catalog.get_role("owner").expect("owner");
//! assert_eq!(owner.first_match(&info), Some(0));
//! ```

mod catalog;
mod errors;
mod matcher;
mod request_info;
mod types;

pub use catalog::{RoleCatalog, RoleCompare, RoleDefinition};
pub use errors::{RbacError, RbacResult};
pub use matcher::{
    api_group_matches, non_resource_url_matches, prefix_wildcard_match, resource_matches,
    rule_allows, scope_matches, verb_matches,
};
pub use request_info::{DEFAULT_API_PREFIX, RequestInfo, RequestInfoFactory, SCOPE_PARAM};
pub use types::{
    API_GROUP_ALL, NON_RESOURCE_ALL, PolicyRule, RESOURCE_ALL, Role, SCOPE_ALL, VERB_ALL,
};

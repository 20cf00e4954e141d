//! Core error taxonomy.
//!
//! # Purpose
//! One error type for the tree, membership and startup surfaces. Each variant
//! carries a stable machine-readable `code()` so outer layers can map kinds to
//! their own transport without matching on messages.
//!
//! # Key invariants
//! - Tree conflicts and membership guard failures are always surfaced, never
//!   retried or downgraded.
//! - `LoadCheck` and `RoleNotFound` are configuration errors and only escape
//!   from startup.
use crate::store::StoreError;
use horizon_rbac::RbacError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("name conflict: {0}")]
    NameConflict(String),
    #[error("path conflict: {0}")]
    PathConflict(String),
    #[error("group conflicts with application: {0}")]
    GroupConflictWithApplication(String),
    #[error("has children: {0}")]
    HasChildren(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    #[error("member already exists: {0}")]
    MemberExist(String),
    #[error("member does not exist: {0}")]
    MemberNotExist(String),
    #[error("not permitted: {0}")]
    NotPermitted(String),
    #[error("cannot grant a role higher than your own: {0}")]
    GrantHigherRole(String),
    #[error("cannot remove a role higher than your own: {0}")]
    RemoveHigherRole(String),
    #[error("role catalog check failed: {0}")]
    LoadCheck(String),
    #[error("role not found: {0}")]
    RoleNotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::NameConflict(_) => "name_conflict",
            Error::PathConflict(_) => "path_conflict",
            Error::GroupConflictWithApplication(_) => "group_conflict_with_application",
            Error::HasChildren(_) => "has_children",
            Error::NotFound(_) => "not_found",
            Error::InvalidParam(_) => "invalid_param",
            Error::MemberExist(_) => "member_exist",
            Error::MemberNotExist(_) => "member_not_exist",
            Error::NotPermitted(_) => "not_permitted",
            Error::GrantHigherRole(_) => "grant_higher_role",
            Error::RemoveHigherRole(_) => "remove_higher_role",
            Error::LoadCheck(_) => "load_check",
            Error::RoleNotFound(_) => "role_not_found",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => Error::NotFound(msg),
            StoreError::NameConflict(msg) => Error::NameConflict(msg),
            StoreError::PathConflict(msg) => Error::PathConflict(msg),
            StoreError::GroupConflictWithApplication(msg) => {
                Error::GroupConflictWithApplication(msg)
            }
            StoreError::HasChildren(msg) => Error::HasChildren(msg),
            StoreError::Conflict(msg) => Error::NameConflict(msg),
            StoreError::Invalid(msg) => Error::InvalidParam(msg),
            // Backend details stay in the log.
            StoreError::Unexpected(err) => {
                tracing::error!(error = ?err, "unexpected store failure");
                Error::Internal("store failure".to_string())
            }
        }
    }
}

impl From<RbacError> for Error {
    fn from(err: RbacError) -> Self {
        match err {
            RbacError::LoadCheck(msg) => Error::LoadCheck(msg),
            RbacError::RoleNotFound(name) => Error::RoleNotFound(name),
            other => Error::LoadCheck(other.to_string()),
        }
    }
}

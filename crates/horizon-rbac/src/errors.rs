use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RbacError {
    #[error("role definition check failed: {0}")]
    LoadCheck(String),
    #[error("role not found: {0}")]
    RoleNotFound(String),
    #[error("invalid role definition: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to read role definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type RbacResult<T> = Result<T, RbacError>;

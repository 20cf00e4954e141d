use crate::auth::principal::Identity;
use crate::auth::rbac::SkipperConfig;
use anyhow::{Context, Result};
use horizon_rbac::DEFAULT_API_PREFIX;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_SERVICE_NAME: &str = "horizon-core";

// Control-plane core configuration sourced from environment variables, with
// an optional YAML override named by HORIZON_CP_CONFIG.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    pub service_name: String,
    /// Role-definition document; the embedded table is used when unset.
    pub roles_file: Option<PathBuf>,
    pub skippers: Vec<SkipperConfig>,
    pub admin_users: Vec<u64>,
    /// First path segment that marks a resource request, e.g. `apis`.
    pub api_prefixes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ControlPlaneConfigOverride {
    service_name: Option<String>,
    roles_file: Option<PathBuf>,
    skippers: Option<Vec<SkipperConfig>>,
    admin_users: Option<Vec<u64>>,
    api_prefixes: Option<Vec<String>>,
}

pub fn default_skippers() -> Vec<SkipperConfig> {
    vec![
        SkipperConfig::new("GET", "^/health"),
        SkipperConfig::new("GET", "^/metrics"),
        SkipperConfig::new("*", "^/apis/front/"),
        SkipperConfig::new("*", "^/apis/internal/"),
        SkipperConfig::new("*", "^/apis/login/"),
    ]
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            roles_file: None,
            skippers: default_skippers(),
            admin_users: Vec::new(),
            api_prefixes: vec![DEFAULT_API_PREFIX.to_string()],
        }
    }
}

impl ControlPlaneConfig {
    pub fn from_env() -> Result<Self> {
        let service_name = std::env::var("HORIZON_SERVICE_NAME")
            .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());
        let roles_file = std::env::var("HORIZON_ROLES_FILE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        Ok(Self {
            service_name,
            roles_file,
            ..Self::default()
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("HORIZON_CP_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read HORIZON_CP_CONFIG: {path}"))?;
            let override_cfg: ControlPlaneConfigOverride = serde_yaml::from_str(&contents)
                .with_context(|| "parse control plane config yaml")?;
            if let Some(value) = override_cfg.service_name {
                config.service_name = value;
            }
            if let Some(value) = override_cfg.roles_file {
                config.roles_file = Some(value);
            }
            if let Some(value) = override_cfg.skippers {
                config.skippers = value;
            }
            if let Some(value) = override_cfg.admin_users {
                config.admin_users = value;
            }
            if let Some(value) = override_cfg.api_prefixes {
                config.api_prefixes = value;
            }
        }
        Ok(config)
    }

    /// Identity for an authenticated user, flagged admin when listed in
    /// `admin_users`.
    pub fn identity(&self, id: u64, name: &str) -> Identity {
        if self.admin_users.contains(&id) {
            Identity::admin(id, name)
        } else {
            Identity::user(id, name)
        }
    }
}

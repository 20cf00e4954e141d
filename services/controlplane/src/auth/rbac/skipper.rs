//! Pre-authorization skippers.
//!
//! A skipper pairs an HTTP method with a path pattern. Requests it matches are
//! allowed before any tree or membership lookup, so the list must stay limited
//! to endpoints that are safe without a resolved caller (health, metrics,
//! front-end assets, login).
//!
//! Patterns are tested against the full request path and, for resource
//! requests, against the path relative to `/<prefix>/<group>/<version>`, so
//! `^/health` covers both `/health` and `/apis/core/v1/health`.
use horizon_rbac::RequestInfo;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const ANY_METHOD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipperConfig {
    #[serde(default = "any_method")]
    pub method: String,
    pub pattern: String,
}

fn any_method() -> String {
    ANY_METHOD.to_string()
}

impl SkipperConfig {
    pub fn new(method: &str, pattern: &str) -> Self {
        Self {
            method: method.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Skipper {
    method: String,
    pattern: Regex,
}

impl Skipper {
    pub fn new(method: &str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            method: method.to_ascii_uppercase(),
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn from_config(config: &SkipperConfig) -> Result<Self, regex::Error> {
        Self::new(&config.method, &config.pattern)
    }

    pub fn matches(&self, method: &str, info: &RequestInfo) -> bool {
        if self.method != ANY_METHOD && !self.method.eq_ignore_ascii_case(method) {
            return false;
        }
        self.pattern.is_match(&info.path)
            || (info.is_resource_request && self.pattern.is_match(&info.relative_path()))
    }
}

//! Request attribute parsing.
//!
//! # Purpose
//! Turns an HTTP method and URL into the attribute set the policy rules are
//! evaluated against.
//!
//! # Grammar
//! - `/<prefix>/<group>/<version>/<resource>[/<name>[/<subresource>[/...]]]`
//!   is a resource request when `<prefix>` is one of the configured API
//!   prefixes (default `apis`).
//! - Everything else is a non-resource request keyed by its path.
//!
//! # Verb mapping
//! `GET`/`HEAD` -> `get` (`list` when no name is present), `POST` -> `create`,
//! `PUT` -> `update`, `PATCH` -> `patch`, `DELETE` -> `delete`. Non-resource
//! requests use the lowercased method.
//!
//! The `scope` query parameter, when present, becomes [`RequestInfo::scope`].
//! Path segments and query values are percent-decoded before matching.
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_API_PREFIX: &str = "apis";
pub const SCOPE_PARAM: &str = "scope";

const PLACEHOLDER_ORIGIN: &str = "http://localhost/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub is_resource_request: bool,
    pub path: String,
    pub verb: String,
    pub api_prefix: String,
    pub api_group: String,
    pub api_version: String,
    pub resource: String,
    pub subresource: String,
    pub name: String,
    pub scope: String,
    /// Path segments after the version, starting at the resource.
    pub parts: Vec<String>,
}

impl RequestInfo {
    /// Path relative to `/<prefix>/<group>/<version>`, or the full path for
    /// non-resource requests.
    pub fn relative_path(&self) -> String {
        if self.is_resource_request {
            format!("/{}", self.parts.join("/"))
        } else {
            self.path.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestInfoFactory {
    api_prefixes: Vec<String>,
}

impl Default for RequestInfoFactory {
    fn default() -> Self {
        Self {
            api_prefixes: vec![DEFAULT_API_PREFIX.to_string()],
        }
    }
}

impl RequestInfoFactory {
    pub fn new(api_prefixes: Vec<String>) -> Self {
        Self { api_prefixes }
    }

    pub fn new_request_info(&self, method: &str, url: &str) -> RequestInfo {
        let Some(parsed) = parse_url(url) else {
            tracing::debug!(url, "unparsable request url treated as non-resource");
            return RequestInfo {
                path: url.to_string(),
                verb: method.to_ascii_lowercase(),
                ..Default::default()
            };
        };
        let mut info = RequestInfo {
            is_resource_request: false,
            path: decode(parsed.path()),
            verb: method.to_ascii_lowercase(),
            scope: parsed
                .query_pairs()
                .find(|(key, _)| key == SCOPE_PARAM)
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default(),
            ..Default::default()
        };

        let segments: Vec<String> = parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).map(decode).collect())
            .unwrap_or_default();
        // prefix, group, version and at least a resource name.
        if segments.len() < 4 {
            return info;
        }
        if !self.api_prefixes.iter().any(|p| *p == segments[0]) {
            return info;
        }

        info.is_resource_request = true;
        info.api_prefix = segments[0].clone();
        info.api_group = segments[1].clone();
        info.api_version = segments[2].clone();
        info.parts = segments[3..].to_vec();
        info.resource = info.parts[0].clone();
        if let Some(name) = info.parts.get(1) {
            info.name = name.clone();
        }
        if let Some(subresource) = info.parts.get(2) {
            info.subresource = subresource.clone();
        }
        info.verb = resource_verb(method, info.name.is_empty()).to_string();
        info
    }
}

fn resource_verb(method: &str, collection: bool) -> &'static str {
    match method.to_ascii_uppercase().as_str() {
        "GET" | "HEAD" if collection => "list",
        "GET" | "HEAD" => "get",
        "POST" => "create",
        "PUT" => "update",
        "PATCH" => "patch",
        "DELETE" => "delete",
        _ => "",
    }
}

/// Relative URLs are resolved against a placeholder origin; only the path
/// and query are kept.
fn parse_url(url: &str) -> Option<Url> {
    Url::parse(PLACEHOLDER_ORIGIN)
        .and_then(|base| base.join(url))
        .ok()
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

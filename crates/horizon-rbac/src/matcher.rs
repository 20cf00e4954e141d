//! Per-dimension policy rule matching.
//!
//! A rule allows a resource request when verb, api group, resource (with
//! subresource) and scope all match. Non-resource requests only consult the
//! verb and the non-resource URL list.
use crate::request_info::RequestInfo;
use crate::types::{
    API_GROUP_ALL, NON_RESOURCE_ALL, PolicyRule, RESOURCE_ALL, SCOPE_ALL, VERB_ALL,
};

/// Match `value` against a pattern that may end in a single trailing `*`.
pub fn prefix_wildcard_match(pattern: &str, value: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => pattern == value,
    }
}

pub fn verb_matches(rule: &PolicyRule, verb: &str) -> bool {
    rule.verbs.iter().any(|v| v == VERB_ALL || v == verb)
}

pub fn api_group_matches(rule: &PolicyRule, api_group: &str) -> bool {
    rule.api_groups
        .iter()
        .any(|g| g == API_GROUP_ALL || g == api_group)
}

/// `combined` is `resource` or `resource/subresource`.
pub fn resource_matches(rule: &PolicyRule, combined: &str, subresource: &str) -> bool {
    rule.resources.iter().any(|r| {
        if r == RESOURCE_ALL || r == combined {
            return true;
        }
        if subresource.is_empty() {
            return false;
        }
        // `*/subresource` grants the subresource on every parent resource.
        r.len() == subresource.len() + 2 && r.starts_with("*/") && r.ends_with(subresource)
    })
}

/// A rule without scopes does not constrain the scope dimension.
pub fn scope_matches(rule: &PolicyRule, scope: &str) -> bool {
    if rule.scopes.is_empty() {
        return true;
    }
    rule.scopes
        .iter()
        .any(|s| s == SCOPE_ALL || prefix_wildcard_match(s, scope))
}

pub fn non_resource_url_matches(rule: &PolicyRule, path: &str) -> bool {
    rule.non_resource_urls
        .iter()
        .any(|u| u == NON_RESOURCE_ALL || prefix_wildcard_match(u, path))
}

pub fn rule_allows(rule: &PolicyRule, info: &RequestInfo) -> bool {
    if info.is_resource_request {
        let combined = if info.subresource.is_empty() {
            info.resource.clone()
        } else {
            format!("{}/{}", info.resource, info.subresource)
        };
        return verb_matches(rule, &info.verb)
            && api_group_matches(rule, &info.api_group)
            && resource_matches(rule, &combined, &info.subresource)
            && scope_matches(rule, &info.scope);
    }
    verb_matches(rule, &info.verb) && non_resource_url_matches(rule, &info.path)
}

//! Control-plane authorization modules.
//!
//! # Purpose
//! Groups the caller identity model and the policy authorizer. Credential
//! verification happens before a request reaches this crate.
pub mod principal;
pub mod rbac;

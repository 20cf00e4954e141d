//! Horizon control-plane core.
//!
//! # Purpose
//! Keeps the group tree consistent, resolves inherited role bindings, and
//! turns a resolved caller plus a request into an allow/deny decision.
//!
//! # Notes
//! Transport and credential verification live outside this crate; the outer
//! API layer builds an [`app::AppState`] and calls into its services.
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod membership;
pub mod model;
pub mod observability;
pub mod store;
pub mod tree;

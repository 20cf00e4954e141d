//! Policy authorization wiring.
//!
//! # Purpose
//! Exposes the per-request authorizer, the pre-authorization skippers, and the
//! batch review entry point consumed by gateway middleware.
pub mod authorize;
pub mod review;
pub mod skipper;

pub use authorize::{Attributes, Authorizer, Decision};
pub use review::{ReviewController, ReviewItem, ReviewResult};
pub use skipper::{Skipper, SkipperConfig};

// Embedded so a deployment works without shipping a role file.
pub const DEFAULT_ROLES: &str = include_str!("rbac/roles.yaml");

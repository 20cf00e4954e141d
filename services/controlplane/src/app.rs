//! Control-plane core wiring.
//!
//! # Purpose
//! Loads the role catalog, compiles skippers, and assembles the services that
//! share one store into an [`AppState`] handed to the outer API layer.
//!
//! # Notes
//! Every configuration failure surfaces here, at startup. Nothing built by this
//! module can fail later because of bad configuration.
use crate::auth::rbac::{Authorizer, DEFAULT_ROLES, ReviewController, Skipper};
use crate::config::ControlPlaneConfig;
use crate::membership::MemberService;
use crate::store::memory::InMemoryStore;
use crate::store::{ControlPlaneStore, ResourceStore};
use crate::tree::GroupService;
use anyhow::{Context, Result};
use horizon_rbac::{RequestInfoFactory, RoleCatalog};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: ControlPlaneConfig,
    pub catalog: Arc<RoleCatalog>,
    pub store: Arc<dyn ControlPlaneStore>,
    pub groups: GroupService,
    pub members: MemberService,
    pub authorizer: Arc<Authorizer>,
    pub review: ReviewController,
}

impl AppState {
    pub fn from_parts(
        config: ControlPlaneConfig,
        catalog: Arc<RoleCatalog>,
        store: Arc<dyn ControlPlaneStore>,
    ) -> Result<Self> {
        let skippers = config
            .skippers
            .iter()
            .map(|skipper| {
                Skipper::from_config(skipper)
                    .with_context(|| format!("compile skipper pattern {}", skipper.pattern))
            })
            .collect::<Result<Vec<_>>>()?;

        let groups = GroupService::new(store.clone());
        let members = MemberService::new(store.clone(), catalog.clone());
        let authorizer = Arc::new(
            Authorizer::new(members.clone(), catalog.clone(), skippers)
                .with_request_info_factory(RequestInfoFactory::new(config.api_prefixes.clone())),
        );
        let review = ReviewController::new(authorizer.clone());
        Ok(Self {
            config,
            catalog,
            store,
            groups,
            members,
            authorizer,
            review,
        })
    }
}

pub fn load_catalog(config: &ControlPlaneConfig) -> Result<RoleCatalog> {
    match &config.roles_file {
        Some(path) => RoleCatalog::from_file(path)
            .with_context(|| format!("load role definitions from {}", path.display())),
        None => RoleCatalog::from_yaml_str(DEFAULT_ROLES).context("load embedded role definitions"),
    }
}

/// Build the core with the in-memory store.
pub fn build_state(config: ControlPlaneConfig) -> Result<AppState> {
    let catalog = Arc::new(load_catalog(&config)?);
    let store: Arc<dyn ControlPlaneStore> = Arc::new(InMemoryStore::new());
    tracing::info!(
        service = %config.service_name,
        backend = store.backend_name(),
        durable = store.is_durable(),
        roles = catalog.roles().len(),
        skippers = config.skippers.len(),
        "control plane core ready"
    );
    AppState::from_parts(config, catalog, store)
}

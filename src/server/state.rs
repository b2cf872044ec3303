use axum::extract::FromRef;

use crate::catalog::CatalogRegistry;
use crate::conesearch::ConeSearchService;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedCatalogRegistry = Arc<CatalogRegistry>;
pub type GuardedConeSearchService = Arc<ConeSearchService>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub registry: GuardedCatalogRegistry,
    pub cone_search: GuardedConeSearchService,
}

impl FromRef<ServerState> for GuardedConeSearchService {
    fn from_ref(input: &ServerState) -> Self {
        input.cone_search.clone()
    }
}

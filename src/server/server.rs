use anyhow::{Context, Result};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{error, info};

use crate::catalog::CatalogRegistry;
use crate::conesearch::{ConeSearchError, ConeSearchService, FieldViolation, ValidationError};

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::Uri,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::compression::CompressionLayer;

use super::metrics::metrics_handler;
use super::{log_requests, state::*, ServerConfig};

type RawParams = Result<Query<Vec<(String, String)>>, QueryRejection>;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
    pub catalogs: Vec<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        catalogs: state.registry.ids(),
    };
    Json(stats)
}

fn malformed_query(
    service: &ConeSearchService,
    rejection: QueryRejection,
    context: &str,
) -> Response {
    let err = ConeSearchError::Validation(ValidationError::Fields(vec![FieldViolation::query(
        "string",
        "Malformed query string",
    )]));
    service
        .responder()
        .respond(&err, &format!("{} ({})", context, rejection.body_text()))
}

async fn conesearch_by_path(
    State(service): State<GuardedConeSearchService>,
    Path(catalog): Path<String>,
    params: RawParams,
) -> Response {
    match params {
        Ok(Query(pairs)) => service.search(&catalog, pairs).await,
        Err(rejection) => malformed_query(&service, rejection, &format!("Search {}", catalog)),
    }
}

async fn conesearch_selected(
    State(service): State<GuardedConeSearchService>,
    params: RawParams,
) -> Response {
    match params {
        Ok(Query(pairs)) => service.search_selected(pairs).await,
        Err(rejection) => malformed_query(&service, rejection, "Search"),
    }
}

async fn unknown_path(State(service): State<GuardedConeSearchService>, uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/').to_string();
    service
        .responder()
        .respond(&ConeSearchError::NotFound(path), &format!("GET {}", uri))
}

pub fn make_app(
    config: ServerConfig,
    registry: Arc<CatalogRegistry>,
    cone_search: Arc<ConeSearchService>,
) -> Result<Router> {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        registry,
        cone_search,
    };

    let app: Router = Router::new()
        .route("/", get(home))
        .route("/conesearch", get(conesearch_selected))
        .route("/{catalog}", get(conesearch_by_path))
        .fallback(unknown_path)
        .with_state(state.clone())
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    metrics_port: u16,
    registry: Arc<CatalogRegistry>,
    cone_search: Arc<ConeSearchService>,
) -> Result<()> {
    let address = format!("{}:{}", config.bind_address, config.port);
    let metrics_address = format!("{}:{}", config.bind_address, metrics_port);
    let app = make_app(config, registry, cone_search)?;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_address)
        .await
        .with_context(|| format!("Failed to bind metrics listener on {}", metrics_address))?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, make_metrics_app()).await {
            error!("Metrics server stopped: {}", e);
        }
    });

    info!("Serving cone search on http://{}", address);
    info!("Serving metrics on http://{}/metrics", metrics_address);

    Ok(axum::serve(listener, app).await?)
}

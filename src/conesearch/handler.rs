use super::error::{ConeSearchError, FieldViolation, ValidationError};
use super::params::QueryParams;
use super::request::SearchRequest;
use super::responder::ErrorResponder;
use super::sink::VoTableSink;
use crate::catalog::{CatalogDescriptor, CatalogRegistry};
use crate::store::{CancelFlag, ConeSearchStore};
use axum::{
    body::{Body, Bytes},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

/// Parameter naming the catalog on the generic `/conesearch` route.
const CATALOG_PARAM: &str = "catalog";

#[derive(Debug, Clone, Copy)]
pub struct StreamingSettings {
    /// Encoded bytes accumulated before a chunk is handed to the body.
    pub chunk_size: usize,
    /// Chunks in flight between the query worker and the client.
    pub channel_capacity: usize,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        StreamingSettings {
            chunk_size: 64 * 1024,
            channel_capacity: 8,
        }
    }
}

/// Runs cone searches end to end: normalize, validate, resolve, execute and
/// encode, with every failure turned into a VOTable error response.
pub struct ConeSearchService {
    registry: Arc<CatalogRegistry>,
    store: Arc<dyn ConeSearchStore>,
    responder: ErrorResponder,
    settings: StreamingSettings,
}

impl ConeSearchService {
    pub fn new(
        registry: Arc<CatalogRegistry>,
        store: Arc<dyn ConeSearchStore>,
        responder: ErrorResponder,
        settings: StreamingSettings,
    ) -> Self {
        ConeSearchService {
            registry,
            store,
            responder,
            settings,
        }
    }

    pub fn registry(&self) -> &CatalogRegistry {
        &self.registry
    }

    pub fn responder(&self) -> &ErrorResponder {
        &self.responder
    }

    /// Search the catalog named in the path.
    pub async fn search<I, K, V>(&self, catalog_id: &str, raw_params: I) -> Response
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let params = QueryParams::normalize(raw_params);
        let context = format!("Search {} [{}]", catalog_id, params.summary());

        match SearchRequest::from_params(catalog_id, &params) {
            Ok(request) => self.dispatch(request, &context).await,
            Err(e) => self.responder.respond(&e.into(), &context),
        }
    }

    /// Search the catalog named by the `catalog` query parameter.
    pub async fn search_selected<I, K, V>(&self, raw_params: I) -> Response
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let params = QueryParams::normalize(raw_params);
        let catalog_id = params.get(CATALOG_PARAM).map(str::trim).unwrap_or_default();
        let context = format!("Search [{}]", params.summary());

        let missing_catalog = catalog_id.is_empty();
        let result = SearchRequest::from_params(catalog_id, &params);
        let result = match (missing_catalog, result) {
            (false, result) => result,
            (true, Ok(_)) => Err(ValidationError::Fields(vec![catalog_required()])),
            (true, Err(ValidationError::Fields(mut violations))) => {
                violations.insert(0, catalog_required());
                Err(ValidationError::Fields(violations))
            }
            (true, Err(other)) => Err(other),
        };

        match result {
            Ok(request) => self.dispatch(request, &context).await,
            Err(e) => self.responder.respond(&e.into(), &context),
        }
    }

    async fn dispatch(&self, request: SearchRequest, context: &str) -> Response {
        let descriptor = match self.registry.resolve(&request.catalog) {
            Ok(descriptor) => descriptor,
            Err(e) => return self.responder.respond(&e, context),
        };
        if let Err(e) = request.check_catalog_limits(&descriptor) {
            return self.responder.respond(&e.into(), context);
        }
        self.execute(request, descriptor, context).await
    }

    /// Starts the query on a blocking worker and waits until the status is
    /// known: first row encoded, empty result, or failure.
    async fn execute(
        &self,
        request: SearchRequest,
        descriptor: Arc<CatalogDescriptor>,
        context: &str,
    ) -> Response {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (chunk_tx, chunk_rx) = mpsc::channel::<Bytes>(self.settings.channel_capacity);
        let cancel = CancelFlag::new();
        let mut guard = cancel.guard();

        let sink = VoTableSink::new(
            descriptor.clone(),
            request.verb,
            self.responder.clone(),
            ready_tx,
            chunk_tx,
            self.settings.chunk_size,
            cancel.clone(),
        );
        let store = self.store.clone();
        let cone = request.cone;
        let worker_context = context.to_string();
        let worker = tokio::task::spawn_blocking(move || {
            let mut sink = sink;
            let result = store.execute(&descriptor, &cone, &cancel, &mut sink);
            debug!("{}: query finished, {} row(s) encoded", worker_context, sink.rows());
            sink.complete(result, &worker_context);
        });
        let panic_context = context.to_string();
        tokio::spawn(async move {
            if let Err(e) = worker.await {
                error!("{}: query worker panicked: {}", panic_context, e);
            }
        });

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                guard.disarm();
                return self.responder.respond(&e, context);
            }
            Err(_) => {
                guard.disarm();
                let err = ConeSearchError::Unknown("query worker stopped before responding".to_string());
                return self.responder.respond(&err, context);
            }
        }

        let stream = futures::stream::unfold((chunk_rx, guard), |(mut rx, mut guard)| async move {
            match rx.recv().await {
                Some(chunk) => Some((Ok::<Bytes, Infallible>(chunk), (rx, guard))),
                None => {
                    guard.disarm();
                    None
                }
            }
        });

        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, request.format.content_type())],
            Body::from_stream(stream),
        )
            .into_response()
    }
}

fn catalog_required() -> FieldViolation {
    FieldViolation::query(CATALOG_PARAM, "Field required")
}

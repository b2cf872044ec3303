//! Row sink that encodes query results into a streamed VOTable.
//!
//! Runs on the blocking query worker. Encoded bytes are accumulated and
//! handed to the response body in chunks over a bounded channel, so a slow
//! client slows row fetching down instead of growing a buffer.

use super::error::ConeSearchError;
use super::responder::ErrorResponder;
use crate::catalog::CatalogDescriptor;
use crate::store::{CancelFlag, ResultColumn, ResultRow, RowSink};
use crate::votable::{plan_fields, FieldPlan, VoTableWriter};
use axum::body::Bytes;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

/// Outcome of the part of a search that decides the response status.
pub type ReadySignal = Result<(), ConeSearchError>;

pub struct VoTableSink {
    catalog: Arc<CatalogDescriptor>,
    verb: u8,
    service_description: String,
    responder: ErrorResponder,
    writer: VoTableWriter<Vec<u8>>,
    columns: Arc<[ResultColumn]>,
    plan: Option<FieldPlan>,
    ready: Option<oneshot::Sender<ReadySignal>>,
    chunks: mpsc::Sender<Bytes>,
    chunk_size: usize,
    cancel: CancelFlag,
    rows: u64,
}

impl VoTableSink {
    pub fn new(
        catalog: Arc<CatalogDescriptor>,
        verb: u8,
        responder: ErrorResponder,
        ready: oneshot::Sender<ReadySignal>,
        chunks: mpsc::Sender<Bytes>,
        chunk_size: usize,
        cancel: CancelFlag,
    ) -> Self {
        VoTableSink {
            catalog,
            verb,
            service_description: responder.description().to_string(),
            responder,
            writer: VoTableWriter::new(Vec::with_capacity(chunk_size)),
            columns: Vec::<ResultColumn>::new().into(),
            plan: None,
            ready: Some(ready),
            chunks,
            chunk_size,
            cancel,
            rows: 0,
        }
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Whether the success status has already been handed to the client.
    pub fn is_committed(&self) -> bool {
        self.ready.is_none()
    }

    fn commit(&mut self) {
        if let Some(ready) = self.ready.take() {
            if ready.send(Ok(())).is_err() {
                self.cancel.cancel();
            }
        }
    }

    fn write_header(&mut self, first_row: Option<&ResultRow>) -> Result<(), ConeSearchError> {
        let plan = plan_fields(&self.catalog, self.verb, &self.columns, first_row)?;
        self.writer.begin_document(&self.service_description)?;
        self.writer.begin_table(
            &self.catalog.id,
            self.catalog.description.as_deref(),
            plan.fields(),
        )?;
        self.plan = Some(plan);
        Ok(())
    }

    /// Sends buffered bytes downstream. Returns `false` once nobody is listening.
    fn flush(&mut self) -> bool {
        if self.writer.get_mut().is_empty() {
            return true;
        }
        let chunk = std::mem::replace(self.writer.get_mut(), Vec::with_capacity(self.chunk_size));
        if self.chunks.blocking_send(Bytes::from(chunk)).is_err() {
            self.cancel.cancel();
            return false;
        }
        true
    }

    fn finish_document(&mut self) -> Result<(), ConeSearchError> {
        self.writer.end_table()?;
        self.writer.end_resource()?;
        self.writer.end_document()
    }

    /// Finishes the response once the query has returned.
    ///
    /// Before commit, the outcome decides the status: errors are handed back
    /// through the ready signal. After commit, errors are reported inside the
    /// document, which is closed either way.
    pub fn complete(mut self, result: Result<(), ConeSearchError>, context: &str) {
        if !self.is_committed() {
            let outcome = result.and_then(|()| {
                if self.plan.is_none() {
                    self.write_header(None)?;
                }
                self.finish_document()
            });
            match outcome {
                Ok(()) => {
                    self.commit();
                    self.flush();
                }
                Err(e) => {
                    if let Some(ready) = self.ready.take() {
                        let _ = ready.send(Err(e));
                    }
                }
            }
            return;
        }

        if self.cancel.is_cancelled() {
            debug!("{}: client went away after {} row(s)", context, self.rows);
            return;
        }

        let closed = match result {
            Ok(()) => self.finish_document(),
            Err(e) => {
                error!(
                    "{} failed after {} row(s) were streamed: {}",
                    context, self.rows, e
                );
                crate::server::metrics::record_error(e.kind());
                self.responder.append_query_status(&mut self.writer)
            }
        };
        if let Err(e) = closed {
            error!("{}: failed to close VOTable document: {}", context, e);
        }
        self.flush();
    }
}

impl RowSink for VoTableSink {
    fn start(&mut self, columns: &Arc<[ResultColumn]>) -> Result<(), ConeSearchError> {
        self.columns = columns.clone();
        Ok(())
    }

    fn row(&mut self, row: ResultRow) -> Result<ControlFlow<()>, ConeSearchError> {
        if self.cancel.is_cancelled() {
            return Ok(ControlFlow::Break(()));
        }
        if self.plan.is_none() {
            self.write_header(Some(&row))?;
        }
        let cells = match &self.plan {
            Some(plan) => plan.encode_row(&row)?,
            None => return Err(ConeSearchError::Unknown("field plan missing".to_string())),
        };
        self.writer.write_row(&cells)?;
        self.rows += 1;

        if !self.is_committed() {
            self.commit();
        }
        if self.writer.get_mut().len() >= self.chunk_size && !self.flush() {
            return Ok(ControlFlow::Break(()));
        }
        if self.cancel.is_cancelled() {
            return Ok(ControlFlow::Break(()));
        }
        Ok(ControlFlow::Continue(()))
    }
}

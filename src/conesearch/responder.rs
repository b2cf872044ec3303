use super::error::{ConeSearchError, GENERIC_ERROR_MESSAGE};
use crate::server::metrics;
use crate::votable::{error_document, VoTableWriter};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

/// Turns any failure into a VOTable error document with the matching status.
#[derive(Debug, Clone)]
pub struct ErrorResponder {
    description: String,
}

impl ErrorResponder {
    pub fn new(description: impl Into<String>) -> Self {
        ErrorResponder {
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Builds the error response. `context` identifies the request in logs.
    pub fn respond(&self, err: &ConeSearchError, context: &str) -> Response {
        let status = err.status_code();
        if status.is_server_error() {
            error!("{} failed: {}", context, err);
        } else {
            debug!("{} rejected ({}): {}", context, status.as_u16(), err);
        }
        metrics::record_error(err.kind());

        let body = self.render(&err.client_message());
        (status, [(header::CONTENT_TYPE, "text/xml")], body).into_response()
    }

    fn render(&self, message: &str) -> Body {
        match error_document(&self.description, message) {
            Ok(doc) => Body::from(doc),
            Err(e) => {
                error!("Failed to render error document: {}", e);
                Body::from(fallback_document())
            }
        }
    }

    /// Closes an already started table with a trailing error status.
    ///
    /// Used once the success status has been sent and can no longer change.
    pub fn append_query_status<W: std::io::Write>(
        &self,
        writer: &mut VoTableWriter<W>,
    ) -> Result<(), ConeSearchError> {
        writer.end_table()?;
        writer.write_query_status_error(GENERIC_ERROR_MESSAGE)?;
        writer.end_resource()?;
        writer.end_document()
    }
}

fn fallback_document() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<VOTABLE version=\"1.1\" xmlns=\"http://www.ivoa.net/xml/VOTable/v1.1\">\n  <INFO ID=\"Error\" name=\"Error\" value=\"{}\"/>\n</VOTABLE>\n",
        GENERIC_ERROR_MESSAGE
    )
}

impl Default for ErrorResponder {
    fn default() -> Self {
        ErrorResponder::new(crate::votable::DEFAULT_SERVICE_DESCRIPTION)
    }
}

//! Simple Cone Search request pipeline.
//!
//! Raw query parameters are normalized, validated, resolved against the
//! catalog registry, executed through the store and streamed back as a
//! VOTable. Any failure is turned into a VOTable error document.

mod error;
mod handler;
mod params;
mod request;
mod responder;
mod sink;

pub use error::{ConeSearchError, FieldViolation, ValidationError, GENERIC_ERROR_MESSAGE};
pub use handler::{ConeSearchService, StreamingSettings};
pub use params::QueryParams;
pub use request::{Cone, OutputFormat, SearchRequest, DEFAULT_VERB};
pub use responder::ErrorResponder;
pub use sink::VoTableSink;

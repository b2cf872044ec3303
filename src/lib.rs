//! Simple Cone Search Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog;
pub mod config;
pub mod conesearch;
pub mod server;
pub mod store;
pub mod votable;

// Re-export commonly used types for convenience
pub use catalog::{CatalogDescriptor, CatalogRegistry, ColumnSpec, Datatype};
pub use conesearch::{ConeSearchError, ConeSearchService};
pub use server::{run_server, RequestsLoggingLevel};
pub use store::{ConeSearchStore, SqliteConeSearchStore};

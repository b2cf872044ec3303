//! Query execution against the catalog backing store.

mod cancel;
mod row;
mod sphere;
mod sqlite_store;

pub use cancel::{CancelFlag, CancelOnDrop};
pub use row::{ResultColumn, ResultRow, Value};
pub use sphere::angular_separation_deg;
pub use sqlite_store::SqliteConeSearchStore;

use crate::catalog::CatalogDescriptor;
use crate::conesearch::{Cone, ConeSearchError};
use std::ops::ControlFlow;
use std::sync::Arc;

/// Consumer of a forward-only result sequence.
///
/// Rows are pushed one at a time, in query order. The sequence is never
/// restarted: running the search again means calling `execute` again.
pub trait RowSink {
    /// Called once, before the first row, with the statement's result columns.
    fn start(&mut self, columns: &Arc<[ResultColumn]>) -> Result<(), ConeSearchError>;

    /// Returning `Break` stops the query early without an error.
    fn row(&mut self, row: ResultRow) -> Result<ControlFlow<()>, ConeSearchError>;
}

/// Executes a catalog's spatial query template.
///
/// `ra`, `dec` and `sr` are always bound as statement parameters and never
/// formatted into the query text. Cursors and connections are released
/// before `execute` returns, whatever the outcome.
pub trait ConeSearchStore: Send + Sync {
    fn execute(
        &self,
        catalog: &CatalogDescriptor,
        cone: &Cone,
        cancel: &CancelFlag,
        sink: &mut dyn RowSink,
    ) -> Result<(), ConeSearchError>;
}

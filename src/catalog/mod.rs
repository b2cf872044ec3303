mod descriptor;
mod registry;

pub use descriptor::{
    CatalogDescriptor, ColumnSpec, Datatype, QueryTemplate, MAX_VERBOSITY, MIN_VERBOSITY,
    PROTOCOL_MAX_RADIUS,
};
pub use registry::CatalogRegistry;

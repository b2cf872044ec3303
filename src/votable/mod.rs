//! VOTable 1.1 output.

mod fields;
mod writer;

pub use fields::{encode_cell, plan_fields, FieldDef, FieldPlan};
pub use writer::{error_document, VoTableWriter};

pub const VOTABLE_VERSION: &str = "1.1";
pub const VOTABLE_NAMESPACE: &str = "http://www.ivoa.net/xml/VOTable/v1.1";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub const DEFAULT_SERVICE_DESCRIPTION: &str = "Simple Cone Search Service";

//! Catalog descriptors.
//!
//! A descriptor carries everything the request pipeline needs to know about
//! one catalog: the spatial query template, the radius ceiling and the column
//! metadata used when encoding results.

use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::HashSet;

pub const MIN_VERBOSITY: u8 = 1;
pub const MAX_VERBOSITY: u8 = 3;

/// Protocol-wide ceiling for the search radius, in degrees.
pub const PROTOCOL_MAX_RADIUS: f64 = 180.0;

/// VOTable primitive datatypes a column can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Datatype {
    Boolean,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    UnicodeChar,
}

impl Datatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::Boolean => "boolean",
            Datatype::Short => "short",
            Datatype::Int => "int",
            Datatype::Long => "long",
            Datatype::Float => "float",
            Datatype::Double => "double",
            Datatype::Char => "char",
            Datatype::UnicodeChar => "unicodeChar",
        }
    }

    /// Variable-length string types, which need `arraysize="*"`.
    pub fn is_textual(&self) -> bool {
        matches!(self, Datatype::Char | Datatype::UnicodeChar)
    }

    /// Maps an SQLite declared column type onto a VOTable datatype using
    /// SQLite's own affinity rules.
    pub fn from_decl_type(decl_type: &str) -> Option<Datatype> {
        let upper = decl_type.to_ascii_uppercase();
        if upper.contains("BOOL") {
            Some(Datatype::Boolean)
        } else if upper.contains("INT") {
            Some(Datatype::Long)
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Some(Datatype::Char)
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Some(Datatype::Double)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_verb() -> u8 {
    MIN_VERBOSITY
}

/// Static metadata for one output column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(default)]
    pub ucd: Option<String>,
    #[serde(default)]
    pub datatype: Option<Datatype>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Lowest verbosity level at which the column is returned.
    #[serde(default = "default_verb")]
    pub verb: u8,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>) -> Self {
        ColumnSpec {
            name: name.into(),
            ucd: None,
            datatype: None,
            unit: None,
            description: None,
            verb: MIN_VERBOSITY,
        }
    }

    pub fn with_ucd(mut self, ucd: impl Into<String>) -> Self {
        self.ucd = Some(ucd.into());
        self
    }

    pub fn with_datatype(mut self, datatype: Datatype) -> Self {
        self.datatype = Some(datatype);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_verb(mut self, verb: u8) -> Self {
        self.verb = verb;
        self
    }
}

/// Parameterized spatial query registered for a catalog.
///
/// The template is never combined with request input: `ra`, `dec` and `sr`
/// are always bound as statement parameters by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate(String);

impl QueryTemplate {
    pub fn new(sql: impl Into<String>) -> Self {
        QueryTemplate(sql.into())
    }

    pub fn as_sql(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct CatalogDescriptor {
    pub id: String,
    pub description: Option<String>,
    pub query: QueryTemplate,
    /// Catalog-specific radius ceiling in degrees.
    pub max_radius: f64,
    /// Ordered column metadata. Empty when the catalog relies on the
    /// query's own result columns.
    pub columns: Vec<ColumnSpec>,
}

impl CatalogDescriptor {
    pub fn new(id: impl Into<String>, query: QueryTemplate, max_radius: f64) -> Self {
        CatalogDescriptor {
            id: id.into(),
            description: None,
            query,
            max_radius,
            columns: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_columns(mut self, columns: Vec<ColumnSpec>) -> Self {
        self.columns = columns;
        self
    }

    pub fn has_column_metadata(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Configured columns returned at the given verbosity, in configured order.
    ///
    /// Returns `None` when no column metadata is configured.
    pub fn columns_for_verbosity(&self, verb: u8) -> Option<Vec<&ColumnSpec>> {
        if !self.has_column_metadata() {
            return None;
        }
        Some(self.columns.iter().filter(|c| c.verb <= verb).collect())
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("Catalog id must not be empty");
        }
        if !self.max_radius.is_finite()
            || self.max_radius < 0.0
            || self.max_radius > PROTOCOL_MAX_RADIUS
        {
            bail!(
                "Catalog '{}': max_radius must be within [0, {}], got {}",
                self.id,
                PROTOCOL_MAX_RADIUS,
                self.max_radius
            );
        }
        if self.query.as_sql().trim().is_empty() {
            bail!("Catalog '{}': query must not be empty", self.id);
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                bail!("Catalog '{}': column names must not be empty", self.id);
            }
            if !seen.insert(column.name.to_ascii_lowercase()) {
                bail!(
                    "Catalog '{}': column '{}' is declared more than once",
                    self.id,
                    column.name
                );
            }
            if !(MIN_VERBOSITY..=MAX_VERBOSITY).contains(&column.verb) {
                bail!(
                    "Catalog '{}': column '{}' has verb {}, expected {}..={}",
                    self.id,
                    column.name,
                    column.verb,
                    MIN_VERBOSITY,
                    MAX_VERBOSITY
                );
            }
        }
        Ok(())
    }
}

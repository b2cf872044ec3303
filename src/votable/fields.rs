//! Field resolution and cell encoding.
//!
//! A field plan is built once per response, from the catalog's configured
//! columns (if any), the statement's result columns and the first row.

use crate::catalog::{CatalogDescriptor, ColumnSpec, Datatype};
use crate::conesearch::ConeSearchError;
use crate::store::{ResultColumn, ResultRow, Value};
use std::collections::HashSet;

struct KnownRole {
    column: &'static str,
    ucd: &'static str,
    datatype: Datatype,
}

/// Columns whose name alone tells their astronomical meaning.
const KNOWN_ROLES: [KnownRole; 4] = [
    KnownRole {
        column: "ra",
        ucd: "POS_EQ_RA_MAIN",
        datatype: Datatype::Double,
    },
    KnownRole {
        column: "dec",
        ucd: "POS_EQ_DEC_MAIN",
        datatype: Datatype::Double,
    },
    KnownRole {
        column: "name",
        ucd: "ID_MAIN",
        datatype: Datatype::Char,
    },
    KnownRole {
        column: "flux",
        ucd: "phot.flux",
        datatype: Datatype::Double,
    },
];

fn known_role(column: &str) -> Option<&'static KnownRole> {
    KNOWN_ROLES
        .iter()
        .find(|role| role.column.eq_ignore_ascii_case(column))
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// XML identifier, unique within the table.
    pub id: String,
    pub name: String,
    pub ucd: Option<String>,
    pub datatype: Datatype,
    pub unit: Option<String>,
    pub description: Option<String>,
    /// Index of the result column feeding this field.
    source: usize,
}

impl FieldDef {
    pub fn arraysize(&self) -> Option<&'static str> {
        self.datatype.is_textual().then_some("*")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlan {
    fields: Vec<FieldDef>,
}

impl FieldPlan {
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Encodes one row into its cells, in field order. `None` is a NULL cell.
    pub fn encode_row(&self, row: &ResultRow) -> Result<Vec<Option<String>>, ConeSearchError> {
        self.fields
            .iter()
            .map(|field| {
                let value = row.value_at(field.source).unwrap_or(&Value::Null);
                encode_cell(field.datatype, value).map_err(|e| match e {
                    ConeSearchError::Encoding(msg) => {
                        ConeSearchError::Encoding(format!("field '{}': {}", field.name, msg))
                    }
                    other => other,
                })
            })
            .collect()
    }
}

fn inferred_from_value(value: &Value) -> Option<Datatype> {
    match value {
        Value::Integer(_) => Some(Datatype::Long),
        Value::Real(_) => Some(Datatype::Double),
        Value::Text(_) => Some(Datatype::Char),
        Value::Null | Value::Blob(_) => None,
    }
}

/// Turns a column name into a valid XML `ID`.
fn sanitize_id(name: &str) -> String {
    let mut id: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    match id.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => id.insert(0, '_'),
    }
    id
}

fn unique_id(name: &str, taken: &mut HashSet<String>) -> String {
    let base = sanitize_id(name);
    let mut id = base.clone();
    let mut suffix = 2;
    while !taken.insert(id.clone()) {
        id = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    id
}

fn resolve_field(
    name: &str,
    spec: Option<&ColumnSpec>,
    source: usize,
    column: &ResultColumn,
    first_row: Option<&ResultRow>,
    taken: &mut HashSet<String>,
) -> FieldDef {
    let role = known_role(name);

    // Known roles pin both tag and type, whatever the catalog configures.
    let datatype = role
        .map(|r| r.datatype)
        .or(spec.and_then(|s| s.datatype))
        .or_else(|| first_row.and_then(|row| row.value_at(source)).and_then(inferred_from_value))
        .or_else(|| column.decl_type.as_deref().and_then(Datatype::from_decl_type))
        .unwrap_or(Datatype::Char);

    let ucd = role
        .map(|r| r.ucd.to_string())
        .or_else(|| spec.and_then(|s| s.ucd.clone()));

    FieldDef {
        id: unique_id(name, taken),
        name: name.to_string(),
        ucd,
        datatype,
        unit: spec.and_then(|s| s.unit.clone()),
        description: spec.and_then(|s| s.description.clone()),
        source,
    }
}

/// Decides which fields a response carries, in which order and with which
/// type and semantic tag.
///
/// With configured columns, the columns visible at `verb` are used in
/// configured order and each must be present in the query results. Without
/// them, every result column is used in query order.
pub fn plan_fields(
    catalog: &CatalogDescriptor,
    verb: u8,
    columns: &[ResultColumn],
    first_row: Option<&ResultRow>,
) -> Result<FieldPlan, ConeSearchError> {
    let mut taken = HashSet::new();

    let fields = match catalog.columns_for_verbosity(verb) {
        Some(specs) => specs
            .into_iter()
            .map(|spec| {
                let source = columns
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(&spec.name))
                    .ok_or_else(|| {
                        ConeSearchError::Encoding(format!(
                            "column '{}' configured for catalog '{}' is not returned by its query",
                            spec.name, catalog.id
                        ))
                    })?;
                Ok(resolve_field(
                    &spec.name,
                    Some(spec),
                    source,
                    &columns[source],
                    first_row,
                    &mut taken,
                ))
            })
            .collect::<Result<Vec<_>, ConeSearchError>>()?,
        None => columns
            .iter()
            .enumerate()
            .map(|(source, column)| {
                resolve_field(&column.name, None, source, column, first_row, &mut taken)
            })
            .collect(),
    };

    Ok(FieldPlan { fields })
}

fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        format!("{:?}", value)
    }
}

fn format_float(value: f64) -> String {
    let narrowed = value as f32;
    if narrowed.is_finite() {
        format!("{:?}", narrowed)
    } else {
        // Non-finite input, or finite doubles beyond f32 range, which stay exact.
        format_double(value)
    }
}

fn integer_in_range(datatype: Datatype, value: i64) -> Result<String, ConeSearchError> {
    let fits = match datatype {
        Datatype::Short => i16::try_from(value).is_ok(),
        Datatype::Int => i32::try_from(value).is_ok(),
        _ => true,
    };
    if fits {
        Ok(value.to_string())
    } else {
        Err(ConeSearchError::Encoding(format!(
            "value {} does not fit in {}",
            value, datatype
        )))
    }
}

fn encoding_error(value: &Value, datatype: Datatype) -> ConeSearchError {
    ConeSearchError::Encoding(format!("cannot represent {:?} as {}", value, datatype))
}

/// Encodes a single value as `TD` text. `Ok(None)` means an empty cell.
pub fn encode_cell(datatype: Datatype, value: &Value) -> Result<Option<String>, ConeSearchError> {
    if value.is_null() {
        return Ok(None);
    }
    if let Value::Blob(bytes) = value {
        return Err(ConeSearchError::Encoding(format!(
            "binary value of {} bytes cannot be encoded as {}",
            bytes.len(),
            datatype
        )));
    }

    let text = match datatype {
        Datatype::Boolean => match value {
            Value::Integer(i) => (if *i != 0 { "T" } else { "F" }).to_string(),
            Value::Real(f) if *f == 0.0 => "F".to_string(),
            Value::Real(f) if *f == 1.0 => "T".to_string(),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "1" | "y" | "yes" => "T".to_string(),
                "f" | "false" | "0" | "n" | "no" => "F".to_string(),
                _ => return Err(encoding_error(value, datatype)),
            },
            _ => return Err(encoding_error(value, datatype)),
        },
        Datatype::Short | Datatype::Int | Datatype::Long => match value {
            Value::Integer(i) => integer_in_range(datatype, *i)?,
            Value::Real(f) if f.is_finite() && f.fract() == 0.0 => {
                if *f < i64::MIN as f64 || *f > i64::MAX as f64 {
                    return Err(encoding_error(value, datatype));
                }
                integer_in_range(datatype, *f as i64)?
            }
            Value::Text(s) => match s.trim().parse::<i64>() {
                Ok(i) => integer_in_range(datatype, i)?,
                Err(_) => return Err(encoding_error(value, datatype)),
            },
            _ => return Err(encoding_error(value, datatype)),
        },
        Datatype::Float | Datatype::Double => {
            let number = match value {
                Value::Integer(i) => *i as f64,
                Value::Real(f) => *f,
                Value::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| encoding_error(value, datatype))?,
                _ => return Err(encoding_error(value, datatype)),
            };
            if datatype == Datatype::Float {
                format_float(number)
            } else {
                format_double(number)
            }
        }
        Datatype::Char | Datatype::UnicodeChar => match value {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => format_double(*f),
            _ => return Err(encoding_error(value, datatype)),
        },
    };
    Ok(Some(text))
}

use rusqlite::types::ValueRef;
use std::sync::Arc;

/// A single cell value as produced by the backing store.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl<'a> From<ValueRef<'a>> for Value {
    fn from(value: ValueRef<'a>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        }
    }
}

/// A result column as reported by the prepared statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumn {
    pub name: String,
    /// Declared type of the underlying table column, if any.
    pub decl_type: Option<String>,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>, decl_type: Option<&str>) -> Self {
        ResultColumn {
            name: name.into(),
            decl_type: decl_type.map(str::to_string),
        }
    }
}

/// One matched catalog entry: values in result-column order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    columns: Arc<[ResultColumn]>,
    values: Vec<Value>,
}

impl ResultRow {
    pub fn new(columns: Arc<[ResultColumn]>, values: Vec<Value>) -> Self {
        ResultRow { columns, values }
    }

    pub fn columns(&self) -> &[ResultColumn] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Looks a value up by column name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .and_then(|index| self.values.get(index))
    }
}

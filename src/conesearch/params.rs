//! Case-insensitive query parameters.
//!
//! Cone search clients may send `RA`, `Ra` or `ra`. Names are folded to
//! lowercase once, before anything inspects them; values are left untouched.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

impl QueryParams {
    /// Builds the canonical parameter set from raw `(name, value)` pairs.
    ///
    /// When the same name appears more than once (in any casing) the last
    /// occurrence wins.
    pub fn normalize<I, K, V>(raw: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = raw
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_lowercase(), value.into()))
            .collect();
        QueryParams { values }
    }

    /// Looks up a parameter by its canonical (lowercase) name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stable `name=value` rendering for logs.
    pub fn summary(&self) -> String {
        let mut pairs: Vec<_> = self.values.iter().collect();
        pairs.sort();
        pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

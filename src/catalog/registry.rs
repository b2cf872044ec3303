//! Immutable catalog registry, loaded once at startup.

use super::descriptor::{CatalogDescriptor, ColumnSpec, QueryTemplate};
use crate::conesearch::ConeSearchError;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
struct CatalogsFile {
    #[serde(default)]
    catalogs: BTreeMap<String, CatalogEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogEntry {
    description: Option<String>,
    max_radius: f64,
    query: String,
    #[serde(default)]
    columns: Vec<ColumnSpec>,
}

impl CatalogEntry {
    fn into_descriptor(self, id: String) -> CatalogDescriptor {
        CatalogDescriptor {
            id,
            description: self.description,
            query: QueryTemplate::new(self.query),
            max_radius: self.max_radius,
            columns: self.columns,
        }
    }
}

/// Maps catalog ids to their descriptors.
///
/// Built once and never mutated afterwards, so it is shared between requests
/// behind an `Arc` without any locking.
#[derive(Debug, Default)]
pub struct CatalogRegistry {
    catalogs: HashMap<String, Arc<CatalogDescriptor>>,
}

impl CatalogRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog configs: {:?}", path))?;
        let registry = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid catalog configs: {:?}", path))?;
        info!(
            "Loaded {} catalog(s) from {:?}: {}",
            registry.len(),
            path,
            registry.ids().join(", ")
        );
        Ok(registry)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogsFile = toml::from_str(content).context("Failed to parse catalog configs")?;
        if file.catalogs.is_empty() {
            bail!("No catalogs defined");
        }
        Self::from_descriptors(
            file.catalogs
                .into_iter()
                .map(|(id, entry)| entry.into_descriptor(id)),
        )
    }

    pub fn from_descriptors<I>(descriptors: I) -> Result<Self>
    where
        I: IntoIterator<Item = CatalogDescriptor>,
    {
        let mut catalogs = HashMap::new();
        for descriptor in descriptors {
            descriptor.validate()?;
            let id = descriptor.id.clone();
            if catalogs.insert(id.clone(), Arc::new(descriptor)).is_some() {
                bail!("Catalog '{}' is defined more than once", id);
            }
        }
        Ok(CatalogRegistry { catalogs })
    }

    pub fn resolve(&self, catalog_id: &str) -> Result<Arc<CatalogDescriptor>, ConeSearchError> {
        self.catalogs
            .get(catalog_id)
            .cloned()
            .ok_or_else(|| ConeSearchError::NotFound(catalog_id.to_string()))
    }

    /// Catalog ids in sorted order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.catalogs.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db: Option<String>,
    pub catalog_configs: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub bind_address: Option<String>,
    pub logging_level: Option<String>,
    pub query_timeout_sec: Option<u64>,
    pub read_pool_size: Option<usize>,

    /// Text of the top-level `<DESCRIPTION>` in every emitted VOTable.
    pub service_description: Option<String>,

    pub streaming: Option<StreamingConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct StreamingConfig {
    pub chunk_size_kib: Option<usize>,
    pub channel_capacity: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

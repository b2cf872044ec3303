mod file_config;

pub use file_config::{FileConfig, StreamingConfig};

use crate::conesearch::StreamingSettings;
use crate::server::RequestsLoggingLevel;
use crate::votable::DEFAULT_SERVICE_DESCRIPTION;
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db: Option<PathBuf>,
    pub catalog_configs: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub bind_address: String,
    pub logging_level: RequestsLoggingLevel,
    pub query_timeout_sec: u64,
    pub read_pool_size: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub catalog_configs_path: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub bind_address: String,
    pub logging_level: RequestsLoggingLevel,
    pub query_timeout: Duration,
    pub read_pool_size: usize,
    pub service_description: String,
    pub streaming: StreamingSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db
            .map(PathBuf::from)
            .or_else(|| cli.db.clone())
            .ok_or_else(|| anyhow!("db must be specified via --db or in config file"))?;
        if !db_path.is_file() {
            bail!("Catalog database does not exist: {:?}", db_path);
        }

        let catalog_configs_path = file
            .catalog_configs
            .map(PathBuf::from)
            .or_else(|| cli.catalog_configs.clone())
            .ok_or_else(|| {
                anyhow!("catalog_configs must be specified via --catalog-configs or in config file")
            })?;
        if !catalog_configs_path.is_file() {
            bail!(
                "Catalog configs file does not exist: {:?}",
                catalog_configs_path
            );
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port {
            bail!("port and metrics_port must differ, both are {}", port);
        }
        let bind_address = file
            .bind_address
            .unwrap_or_else(|| cli.bind_address.clone());

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let query_timeout_sec = file.query_timeout_sec.unwrap_or(cli.query_timeout_sec);
        if query_timeout_sec == 0 {
            bail!("query_timeout_sec must be positive");
        }
        let read_pool_size = file.read_pool_size.unwrap_or(cli.read_pool_size);
        if read_pool_size == 0 {
            bail!("read_pool_size must be positive");
        }

        let service_description = file
            .service_description
            .unwrap_or_else(|| DEFAULT_SERVICE_DESCRIPTION.to_string());

        let defaults = StreamingSettings::default();
        let streaming_file = file.streaming.unwrap_or_default();
        let streaming = StreamingSettings {
            chunk_size: streaming_file
                .chunk_size_kib
                .map(|kib| kib.max(1) * 1024)
                .unwrap_or(defaults.chunk_size),
            channel_capacity: streaming_file
                .channel_capacity
                .map(|c| c.max(1))
                .unwrap_or(defaults.channel_capacity),
        };

        Ok(Self {
            db_path,
            catalog_configs_path,
            port,
            metrics_port,
            bind_address,
            logging_level,
            query_timeout: Duration::from_secs(query_timeout_sec),
            read_pool_size,
            service_description,
            streaming,
        })
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cone_search_server::config::{AppConfig, CliConfig, FileConfig};
use cone_search_server::conesearch::ErrorResponder;
use cone_search_server::server::{self, run_server, RequestsLoggingLevel, ServerConfig};
use cone_search_server::{CatalogRegistry, ConeSearchService, SqliteConeSearchStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Optional TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database holding the catalogs.
    #[clap(long, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    /// Path to the TOML file describing the served catalogs.
    #[clap(long, value_parser = parse_path)]
    pub catalog_configs: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// Address both listeners bind to.
    #[clap(long, default_value = "127.0.0.1")]
    pub bind_address: String,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Queries running longer than this are interrupted.
    #[clap(long, default_value_t = 30)]
    pub query_timeout_sec: u64,

    /// Number of read-only SQLite connections.
    #[clap(long, default_value_t = 4)]
    pub read_pool_size: usize,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db: self.db.clone(),
            catalog_configs: self.catalog_configs.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            bind_address: self.bind_address.clone(),
            logging_level: self.logging_level.clone(),
            query_timeout_sec: self.query_timeout_sec,
            read_pool_size: self.read_pool_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Initializing metrics...");
    server::metrics::init_metrics();

    info!("Loading catalogs from {:?}...", config.catalog_configs_path);
    let registry = Arc::new(CatalogRegistry::load(&config.catalog_configs_path)?);
    server::metrics::set_catalogs_configured(registry.len());

    info!("Opening SQLite catalog database at {:?}...", config.db_path);
    let store = SqliteConeSearchStore::open(
        &config.db_path,
        config.read_pool_size,
        config.query_timeout,
    )?;
    let broken = store.verify_templates(&registry);
    if !broken.is_empty() {
        warn!(
            "{} catalog(s) have invalid query templates and will fail at search time: {}",
            broken.len(),
            broken.join(", ")
        );
    }

    let responder = ErrorResponder::new(config.service_description);
    let cone_search = Arc::new(ConeSearchService::new(
        registry.clone(),
        Arc::new(store),
        responder,
        config.streaming,
    ));

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level,
        port: config.port,
        bind_address: config.bind_address,
    };

    info!("Ready to serve at port {}!", config.port);
    run_server(server_config, config.metrics_port, registry, cone_search).await
}

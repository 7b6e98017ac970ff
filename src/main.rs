use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aulas_catalog_server::classroom_store::SqliteClassroomStore;
use aulas_catalog_server::config;
use aulas_catalog_server::ingestion::IngestionManager;
use aulas_catalog_server::media::MediaStore;
use aulas_catalog_server::server::{run_server, RequestsLoggingLevel, ServerConfig};
use aulas_catalog_server::spectrogram::SpectrogramRenderer;

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding database.db and, by default, the uploads and spectrograms
    /// directories. Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub data_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Maximum request body size in bytes. Larger uploads are rejected with 413.
    #[clap(long, default_value_t = config::DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Create the database and media directories, then exit.
    #[clap(long)]
    pub init_db: bool,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            data_dir: args.data_dir.clone(),
            port: args.port,
            logging_level: args.logging_level.clone(),
            max_upload_bytes: args.max_upload_bytes,
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
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  data_dir: {:?}", app_config.data_dir);
    info!("  uploads_dir: {:?}", app_config.uploads_dir);
    info!("  spectrograms_dir: {:?}", app_config.spectrograms_dir);
    info!("  port: {}", app_config.port);
    info!("  spectrogram: {:?}", app_config.spectrogram);

    let media = MediaStore::new(app_config.media_dirs());
    media.init().await?;

    let store = Arc::new(SqliteClassroomStore::new(app_config.database_path())?);

    if cli_args.init_db {
        info!("Database initialized.");
        return Ok(());
    }

    let renderer = SpectrogramRenderer::new(
        app_config.spectrogram.clone(),
        app_config.spectrograms_dir.clone(),
    );
    let ingestion_manager = IngestionManager::new(store, media, renderer);

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        max_upload_bytes: app_config.max_upload_bytes,
    };

    info!("Ready to serve at port {}!", app_config.port);
    run_server(server_config, ingestion_manager).await
}

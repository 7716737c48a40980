use std::sync::Arc;

use tracing::{error, info};

use lanshare::db::SettingsRepository;
use lanshare::{Config, Database, FileStorage, WebServer};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = lanshare::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        lanshare::logging::init_console_only(&config.logging.level);
    }

    info!("LANSHARE - local network file sharing");

    if let Err(e) = run(config).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> lanshare::Result<()> {
    config.validate()?;

    let db = Database::open(&config.database.path).await?;
    SettingsRepository::new(db.pool())
        .seed_defaults(&config.storage)
        .await?;
    let db = Arc::new(db);

    let storage = FileStorage::new(&config.files.storage_path)?;
    info!("File storage at {}", config.files.storage_path);
    let purged = storage.purge_staging()?;
    if purged > 0 {
        info!(purged, "Removed interrupted uploads");
    }

    let server = WebServer::new(&config.server, &config.web, db, storage)?;
    info!("Server configured on {}", server.addr());

    server.run().await?;
    Ok(())
}

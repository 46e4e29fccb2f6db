use std::sync::Arc;

use tracing::{error, info};

use filegate::file::{
    BlobStorage, ContentProcessor, FileRegistry, FileService, LocalStorage, SqliteFileRegistry,
    TextExtractor,
};
use filegate::web::{JwtClaims, JwtState, WebServer};
use filegate::{Config, Database, Role};

const CONFIG_PATH: &str = "config.toml";

const USAGE: &str = "usage:
  filegate                         run the server
  filegate token <user_id> <role>  print a bearer token (role: pending, user, admin)";

fn load_config() -> Config {
    Config::load_with_env(CONFIG_PATH).unwrap_or_else(|e| {
        eprintln!("Failed to load {CONFIG_PATH}: {e}");
        eprintln!("Using default configuration.");
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    })
}

fn issue_token(config: &Config, user_id: &str, role: &str) -> Result<String, String> {
    let role: Role = role.parse()?;
    let claims = JwtClaims::new(user_id, user_id, role, config.web.jwt_expiry_secs);
    JwtState::new(&config.web.jwt_secret)
        .issue(&claims)
        .map_err(|e| format!("failed to sign token: {e}"))
}

async fn serve(config: Config) -> filegate::Result<()> {
    let db = Database::open(&config.database.path).await?;

    let registry: Arc<dyn FileRegistry> = Arc::new(SqliteFileRegistry::new(db.pool().clone()));
    let storage: Arc<dyn BlobStorage> = Arc::new(LocalStorage::new(&config.storage.upload_dir)?);
    let processor: Arc<dyn ContentProcessor> = Arc::new(TextExtractor::new(
        registry.clone(),
        storage.clone(),
        config.processing.max_content_bytes,
    ));
    let files = FileService::new(registry, storage, processor);

    info!(upload_dir = %config.storage.upload_dir, "blob storage ready");

    let server = WebServer::new(&config.server, &config.web, files)?;
    server.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let config = load_config();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [] => {}
        [cmd, user_id, role] if cmd == "token" => {
            if let Err(e) = config.validate() {
                eprintln!("{e}");
                std::process::exit(1);
            }
            match issue_token(&config, user_id, role) {
                Ok(token) => println!("{token}"),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
            return;
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    if let Err(e) = filegate::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        filegate::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("{e}");
        std::process::exit(1);
    }

    info!("filegate - file upload and retrieval service");
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    if let Err(e) = serve(config).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}

//! Shelfkeep server
//!
//! Configuration comes from `SHELFKEEP_CONFIG` (YAML) and the environment;
//! see [`catalog::config::AppConfig`].

use anyhow::Result;
use catalog::config::AppConfig;
use catalog::core::geocoder;
use catalog::server::ServerBuilder;
use catalog::storage::open_store;
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &AppConfig) {
    let default_filter = if config.is_development() {
        "shelfkeep=debug,catalog=debug,tower_http=debug"
    } else {
        "shelfkeep=info,catalog=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

async fn run(config: AppConfig) -> Result<()> {
    let addr = config.bind_address();
    if config.auth.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET not set, using the development signing secret");
    }
    let store = open_store(&config).await?;
    let geocoder = geocoder::from_config(&config.geocoder)?;

    tracing::info!(
        mode = ?config.server.run_mode,
        store = store.backend(),
        geocoder = ?config.geocoder.provider,
        "starting shelfkeep"
    );

    ServerBuilder::new()
        .with_config(config)
        .with_shared_store(store)
        .with_shared_geocoder(geocoder)
        .serve(&addr)
        .await
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %format!("{:#}", e), "server stopped");
        std::process::exit(1);
    }
}

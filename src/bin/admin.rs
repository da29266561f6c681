//! Shelfkeep administration tool
//!
//! ```text
//! shelfkeep-admin import _data/books.json
//! shelfkeep-admin destroy
//! shelfkeep-admin token --user 42 --role publisher
//! ```

use anyhow::{Result, bail};
use catalog::config::AppConfig;
use catalog::core::auth::JwtAuthProvider;
use catalog::core::geocoder;
use catalog::storage::open_store;
use catalog::storage::seed::{destroy_books, import_books, read_seed_file};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shelfkeep-admin")]
#[command(about = "Seed, wipe and mint tokens for a shelfkeep catalog")]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create every book in a JSON array file
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Delete every book
    Destroy,
    /// Print a signed token for local testing
    Token {
        /// Subject written into the token
        #[arg(long, default_value = "admin")]
        user: String,

        #[arg(long, default_value = "publisher")]
        role: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Commands::Import { file } => {
            if config.database.uri.is_none() {
                bail!("MONGO_URI is not set; importing into the in-memory store would be lost on exit");
            }
            let payloads = read_seed_file(&file)?;
            let store = open_store(&config).await?;
            let geocoder = geocoder::from_config(&config.geocoder)?;
            let imported = import_books(store.as_ref(), geocoder.as_ref(), payloads).await?;
            println!("Data imported.... ({} books)", imported);
        }
        Commands::Destroy => {
            if config.database.uri.is_none() {
                bail!("MONGO_URI is not set; nothing to destroy");
            }
            let store = open_store(&config).await?;
            let removed = destroy_books(store.as_ref()).await?;
            println!("Data destroyed.... ({} books)", removed);
        }
        Commands::Token { user, role } => {
            let provider = JwtAuthProvider::new(
                config.jwt_secret(),
                config.auth.cookie_name.clone(),
                config.auth.expire_days,
            );
            println!("{}", provider.issue_token(&user, &role)?);
        }
    }

    Ok(())
}

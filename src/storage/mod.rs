//! Storage implementations for different backends

pub mod in_memory;
#[cfg(feature = "mongodb_backend")]
pub mod mongodb;
pub mod seed;

pub use in_memory::InMemoryBookStore;
#[cfg(feature = "mongodb_backend")]
pub use mongodb::MongoBookStore;

use anyhow::Result;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::store::BookStore;

/// Open the store selected by configuration
///
/// A configured MongoDB URI selects the MongoDB store (unique author index
/// included); otherwise the in-memory store is used.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn BookStore>> {
    match config.database.uri.as_deref() {
        #[cfg(feature = "mongodb_backend")]
        Some(uri) => {
            let store = MongoBookStore::connect(uri, &config.database.name).await?;
            store.ensure_indexes().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongodb_backend"))]
        Some(_) => anyhow::bail!(
            "MONGO_URI is set but this build lacks the mongodb_backend feature"
        ),
        None => {
            tracing::warn!("no database configured, using the in-memory store");
            Ok(Arc::new(InMemoryBookStore::new()))
        }
    }
}

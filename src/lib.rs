//! # Shelfkeep
//!
//! REST backend for a catalog of book listings.
//!
//! ## Features
//!
//! - **Query-string filtering**: `rating[gte]=4`, `location[city]=Boston`,
//!   `author[in]=A,B` become a typed filter that every store evaluates the same way
//! - **Projection, sorting, pagination**: `select`, `sort`, `page`, `limit` with
//!   `next`/`prev` navigation hints
//! - **Geocoding on save**: a free-text `address` becomes a GeoJSON `location`
//! - **Photo uploads**: MIME and size checks before anything touches disk
//! - **Token auth**: session cookie or bearer token, role-based guards
//! - **Pluggable storage**: in-memory (default) and MongoDB (`mongodb_backend`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use catalog::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     let addr = config.bind_address();
//!     ServerBuilder::new()
//!         .with_config(config)
//!         .with_store(InMemoryBookStore::new())
//!         .with_geocoder(FixedGeocoder::echo())
//!         .serve(&addr)
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{AuthContext, AuthPolicy, AuthProvider, JwtAuthProvider},
        book::{Book, BookPatch, Location, NewBook},
        error::{CatalogError, CatalogResult},
        geocoder::{FixedGeocoder, GeocodedAddress, Geocoder, MapQuestGeocoder},
        hooks::{apply_patch, prepare_new_book, slugify},
        query::{ListingFilterRequest, ListingQuery, Pagination, PaginationWindow},
        store::BookStore,
    };

    // === Storage ===
    pub use crate::storage::InMemoryBookStore;
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::MongoBookStore;

    // === Config ===
    pub use crate::config::{AppConfig, GeocoderProvider, PaginationTotal, RunMode};

    // === Server ===
    pub use crate::server::{AppState, ServerBuilder, build_router};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}

//! Shared application state
//!
//! Built once at startup and handed to every handler through axum `State`.
//! Cloning is cheap: every member is reference counted.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::auth::AuthProvider;
use crate::core::geocoder::Geocoder;
use crate::core::store::BookStore;

#[derive(Clone)]
pub struct AppState {
    /// Book persistence
    pub store: Arc<dyn BookStore>,

    /// Address resolution for create/update
    pub geocoder: Arc<dyn Geocoder>,

    /// Token verification for guarded routes
    pub auth: Arc<dyn AuthProvider>,

    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn BookStore>,
        geocoder: Arc<dyn Geocoder>,
        auth: Arc<dyn AuthProvider>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            geocoder,
            auth,
            config: Arc::new(config),
        }
    }
}

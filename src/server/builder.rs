//! ServerBuilder for fluent API to build HTTP servers

use anyhow::{Result, anyhow};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::router::build_router;
use super::state::AppState;
use crate::config::AppConfig;
use crate::core::auth::{AuthProvider, JwtAuthProvider};
use crate::core::geocoder::{FixedGeocoder, Geocoder};
use crate::core::store::BookStore;

/// Builder for the catalog HTTP server
///
/// The store is required. The geocoder defaults to the offline echo
/// geocoder and the auth provider to a JWT provider configured from
/// [`AppConfig`].
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(config)
///     .with_store(InMemoryBookStore::new())
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    store: Option<Arc<dyn BookStore>>,
    geocoder: Option<Arc<dyn Geocoder>>,
    auth: Option<Arc<dyn AuthProvider>>,
    custom_routes: Vec<Router<AppState>>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            store: None,
            geocoder: None,
            auth: None,
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the book store (required)
    pub fn with_store(mut self, store: impl BookStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set an already shared book store
    pub fn with_shared_store(mut self, store: Arc<dyn BookStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_geocoder(mut self, geocoder: impl Geocoder + 'static) -> Self {
        self.geocoder = Some(Arc::new(geocoder));
        self
    }

    pub fn with_shared_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_auth_provider(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    /// Add custom routes sharing the application state
    pub fn with_custom_routes(mut self, routes: Router<AppState>) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Assemble the shared state
    pub fn build_state(&mut self) -> Result<AppState> {
        let store = self
            .store
            .take()
            .ok_or_else(|| anyhow!("BookStore is required. Call .with_store()"))?;

        let geocoder = self
            .geocoder
            .take()
            .unwrap_or_else(|| Arc::new(FixedGeocoder::echo()));

        let auth = self.auth.take().unwrap_or_else(|| {
            Arc::new(JwtAuthProvider::new(
                self.config.jwt_secret(),
                self.config.auth.cookie_name.clone(),
                self.config.auth.expire_days,
            ))
        });

        Ok(AppState::new(store, geocoder, auth, self.config.clone()))
    }

    /// Build the final router
    pub fn build(mut self) -> Result<Router> {
        let state = self.build_state()?;
        let custom_routes = std::mem::take(&mut self.custom_routes);

        let mut app = build_router(state.clone());
        for routes in custom_routes {
            app = app.merge(routes.with_state(state.clone()));
        }
        Ok(app)
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A signal handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

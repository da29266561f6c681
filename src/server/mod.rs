//! HTTP server for the catalog
//!
//! This module provides a `ServerBuilder` that wires the store, geocoder and
//! auth provider into shared state and registers:
//! - the book listing and CRUD routes
//! - the photo upload route
//! - the principal lookup and health routes
//! - static file serving for the public directory

pub mod builder;
pub mod guard;
pub mod handlers;
pub mod response;
pub mod router;
pub mod state;

pub use builder::ServerBuilder;
pub use guard::RouteGuard;
pub use router::build_router;
pub use state::AppState;

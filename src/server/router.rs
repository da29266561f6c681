//! Route table
//!
//! - `GET    /api/v1/books` list with filters, `select`, `sort`, `page`, `limit`
//! - `GET    /api/v1/books/{id}`
//! - `POST   /api/v1/books` (publisher/admin)
//! - `PUT    /api/v1/books/{id}` (publisher/admin)
//! - `DELETE /api/v1/books/{id}` (publisher/admin)
//! - `PUT    /api/v1/books/{id}/photo` (publisher/admin, multipart `file`)
//! - `GET    /api/v1/auth/me` (publisher/admin)
//! - `GET    /health`
//!
//! Anything else falls through to the static `public/` directory.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::core::auth::AuthPolicy;
use crate::server::guard::RouteGuard;
use crate::server::handlers::{
    create_book, current_principal, delete_book, get_book, health_check, list_books,
    update_book, upload_photo,
};
use crate::server::state::AppState;

/// Multipart framing allowance on top of the photo size ceiling
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Routes under `/api/v1/books`
pub fn book_routes(state: &AppState) -> Router<AppState> {
    let guard = RouteGuard::new(state.auth.clone(), AuthPolicy::publishers());
    let photo_limit = state
        .config
        .uploads
        .max_file_upload
        .saturating_add(MULTIPART_OVERHEAD);

    let public = Router::new()
        .route("/", get(list_books))
        .route("/{id}", get(get_book));

    let protected = Router::new()
        .route("/", post(create_book))
        .route("/{id}", put(update_book).delete(delete_book))
        .route(
            "/{id}/photo",
            put(upload_photo).layer(DefaultBodyLimit::max(photo_limit)),
        )
        .route_layer(from_fn_with_state(guard, RouteGuard::middleware));

    public.merge(protected)
}

/// Routes under `/api/v1/auth`
pub fn auth_routes(state: &AppState) -> Router<AppState> {
    let guard = RouteGuard::new(state.auth.clone(), AuthPolicy::publishers());
    Router::new()
        .route("/me", get(current_principal))
        .route_layer(from_fn_with_state(guard, RouteGuard::middleware))
}

/// Assemble the full application router
pub fn build_router(state: AppState) -> Router {
    let public_dir = ServeDir::new(&state.config.uploads.public_dir);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/books", book_routes(&state))
        .nest("/api/v1/auth", auth_routes(&state))
        .fallback_service(public_dir)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

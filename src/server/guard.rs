//! Route guard middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::core::auth::{AuthPolicy, AuthProvider};
use crate::core::error::CatalogResult;

/// Middleware state: who verifies credentials and what they must satisfy
///
/// On success the resolved [`AuthContext`](crate::core::auth::AuthContext) is
/// stored in the request extensions for downstream handlers.
#[derive(Clone)]
pub struct RouteGuard {
    auth: Arc<dyn AuthProvider>,
    policy: AuthPolicy,
}

impl RouteGuard {
    pub fn new(auth: Arc<dyn AuthProvider>, policy: AuthPolicy) -> Self {
        Self { auth, policy }
    }

    /// Reject the request unless its credentials satisfy the policy
    pub async fn middleware(
        State(guard): State<Self>,
        mut request: Request,
        next: Next,
    ) -> CatalogResult<Response> {
        let context = guard.auth.extract_context(request.headers()).await?;
        guard.policy.authorize(&context)?;

        tracing::debug!(
            user = context.user_id().unwrap_or("anonymous"),
            path = %request.uri().path(),
            "request authorized"
        );
        request.extensions_mut().insert(context);
        Ok(next.run(request).await)
    }
}

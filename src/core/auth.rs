//! Authorization system
//!
//! Requests carry a signed token either in the session cookie or in an
//! `Authorization: Bearer` header. The [`AuthProvider`] turns request headers
//! into an [`AuthContext`]; routes declare an [`AuthPolicy`] the context must
//! satisfy.

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::core::error::{CatalogError, CatalogResult};

/// Roles allowed to modify the catalog
pub const PUBLISHER_ROLES: [&str; 2] = ["publisher", "admin"];

/// Authorization context extracted from a request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AuthContext {
    /// Authenticated user
    User { user_id: String, role: String },

    /// No credentials presented
    Anonymous,
}

impl AuthContext {
    /// Get user_id if available
    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthContext::User { user_id, .. } => Some(user_id),
            AuthContext::Anonymous => None,
        }
    }

    /// Get role if available
    pub fn role(&self) -> Option<&str> {
        match self {
            AuthContext::User { role, .. } => Some(role),
            AuthContext::Anonymous => None,
        }
    }
}

/// Roles a route requires; the caller must hold any one of them
#[derive(Debug, Clone, PartialEq)]
pub struct AuthPolicy {
    roles: Vec<String>,
}

impl AuthPolicy {
    pub fn any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Policy guarding catalog mutations
    pub fn publishers() -> Self {
        Self::any_of(PUBLISHER_ROLES)
    }

    /// Check if auth context satisfies this policy
    pub fn check(&self, context: &AuthContext) -> bool {
        context
            .role()
            .is_some_and(|role| self.roles.iter().any(|r| r == role))
    }

    /// Like [`check`](Self::check), but explains the refusal
    ///
    /// Anonymous callers get `Unauthorized`; authenticated callers lacking
    /// the role get `Forbidden`.
    pub fn authorize(&self, context: &AuthContext) -> CatalogResult<()> {
        if self.check(context) {
            return Ok(());
        }
        match context {
            AuthContext::Anonymous => Err(CatalogError::Unauthorized),
            AuthContext::User { role, .. } => Err(CatalogError::Forbidden { role: role.clone() }),
        }
    }
}

/// Trait for auth providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Extract auth context from request headers
    ///
    /// Absent credentials yield [`AuthContext::Anonymous`]; credentials that
    /// are present but invalid are an error.
    async fn extract_context(&self, headers: &HeaderMap) -> CatalogResult<AuthContext>;
}

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub role: String,
    /// Expiration time (unix seconds)
    pub exp: usize,
    /// Issued at (unix seconds)
    pub iat: usize,
}

/// HS256 token provider reading the session cookie or a bearer header
#[derive(Clone)]
pub struct JwtAuthProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
    expire_days: i64,
}

impl std::fmt::Debug for JwtAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthProvider")
            .field("cookie_name", &self.cookie_name)
            .field("expire_days", &self.expire_days)
            .finish_non_exhaustive()
    }
}

impl JwtAuthProvider {
    pub fn new(secret: &str, cookie_name: impl Into<String>, expire_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            cookie_name: cookie_name.into(),
            expire_days,
        }
    }

    /// Sign a token for `user_id` with `role`
    pub fn issue_token(&self, user_id: &str, role: &str) -> CatalogResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::days(self.expire_days)).timestamp() as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| CatalogError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> CatalogResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected token");
                CatalogError::Unauthorized
            })
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn extract_context(&self, headers: &HeaderMap) -> CatalogResult<AuthContext> {
        let Some(token) = extract_token(headers, &self.cookie_name) else {
            return Ok(AuthContext::Anonymous);
        };
        let claims = self.verify(&token)?;
        Ok(AuthContext::User {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

/// Token from `Authorization: Bearer <t>`, else from the named cookie
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty() && *value != "none")
        .map(|(_, value)| value.to_string())
}

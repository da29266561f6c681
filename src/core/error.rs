//! Typed error handling for the catalog service
//!
//! Every handler returns [`CatalogResult`] and propagates failures with `?`.
//! The [`IntoResponse`] implementation on [`CatalogError`] is the single place
//! where errors become HTTP responses, so the envelope and status mapping stay
//! consistent across endpoints.
//!
//! # Error Categories
//!
//! - client errors: [`CatalogError::NotFound`], [`CatalogError::InvalidId`],
//!   [`CatalogError::Validation`], [`CatalogError::DuplicateKey`],
//!   [`CatalogError::Upload`], [`CatalogError::InvalidQuery`]
//! - auth errors: [`CatalogError::Unauthorized`], [`CatalogError::Forbidden`]
//! - server errors: [`CatalogError::Upstream`], [`CatalogError::Storage`],
//!   [`CatalogError::Internal`]. Their messages are logged, never returned.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn fetch(store: &dyn BookStore, id: Uuid) -> CatalogResult<Book> {
//!     store.get(&id).await?.ok_or(CatalogError::NotFound { id: id.to_string() })
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

use crate::core::upload::UploadError;

/// Generic message returned for every server-side failure
pub const SERVER_ERROR_MESSAGE: &str = "Server Error";

/// The main error type for the catalog service
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// No record with this identifier
    NotFound { id: String },

    /// The identifier is not a valid record id
    InvalidId { value: String },

    /// Record failed its schema constraints
    Validation(Vec<FieldValidationError>),

    /// Unique constraint violated at the store layer
    DuplicateKey { field: String },

    /// Photo upload rejected before any write
    Upload(UploadError),

    /// Query string could not be translated into a store query
    InvalidQuery { message: String },

    /// Missing or invalid credentials
    Unauthorized,

    /// Authenticated principal lacks a required role
    Forbidden { role: String },

    /// An external collaborator (geocoder, filesystem) failed
    Upstream { service: String, message: String },

    /// The backing store failed
    Storage { backend: String, message: String },

    /// Anything else
    Internal(String),
}

/// A single field validation error
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl FieldValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::NotFound { id } => write!(f, "Book not found with id of {}", id),
            CatalogError::InvalidId { value } => write!(f, "Book not found with id of {}", value),
            CatalogError::Validation(errors) => {
                let msgs: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
                write!(f, "{}", msgs.join(", "))
            }
            CatalogError::DuplicateKey { .. } => write!(f, "Duplicate field value entered"),
            CatalogError::Upload(e) => write!(f, "{}", e),
            CatalogError::InvalidQuery { message } => write!(f, "Invalid query: {}", message),
            CatalogError::Unauthorized => write!(f, "Not authorized to access this route"),
            CatalogError::Forbidden { role } => {
                write!(f, "User role {} is not authorized to access this route", role)
            }
            CatalogError::Upstream { service, message } => {
                write!(f, "{} failed: {}", service, message)
            }
            CatalogError::Storage { backend, message } => {
                write!(f, "{} storage error: {}", backend, message)
            }
            CatalogError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Upload(e) => Some(e),
            _ => None,
        }
    }
}

/// Wire shape of every failed response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl CatalogError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::InvalidId { .. }
            | CatalogError::Validation(_)
            | CatalogError::DuplicateKey { .. }
            | CatalogError::Upload(_)
            | CatalogError::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
            CatalogError::Unauthorized => StatusCode::UNAUTHORIZED,
            CatalogError::Forbidden { .. } => StatusCode::FORBIDDEN,
            CatalogError::Upstream { .. }
            | CatalogError::Storage { .. }
            | CatalogError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            CatalogError::NotFound { .. } => "NOT_FOUND",
            CatalogError::InvalidId { .. } => "INVALID_ID",
            CatalogError::Validation(_) => "VALIDATION_ERROR",
            CatalogError::DuplicateKey { .. } => "DUPLICATE_KEY",
            CatalogError::Upload(_) => "UPLOAD_REJECTED",
            CatalogError::InvalidQuery { .. } => "INVALID_QUERY",
            CatalogError::Unauthorized => "UNAUTHORIZED",
            CatalogError::Forbidden { .. } => "FORBIDDEN",
            CatalogError::Upstream { .. } => "UPSTREAM_ERROR",
            CatalogError::Storage { .. } => "STORAGE_ERROR",
            CatalogError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the underlying message is safe to show to the caller
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Shorthand for a single-field validation failure
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogError::Validation(vec![FieldValidationError::new(field, message)])
    }

    /// Convert to the response envelope
    pub fn to_response(&self) -> ErrorResponse {
        let error = if self.is_client_error() {
            self.to_string()
        } else {
            SERVER_ERROR_MESSAGE.to_string()
        };
        ErrorResponse {
            success: false,
            error,
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }
        (status, Json(self.to_response())).into_response()
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<UploadError> for CatalogError {
    fn from(err: UploadError) -> Self {
        CatalogError::Upload(err)
    }
}

impl From<validator::ValidationErrors> for CatalogError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter()
                    .map(|e| {
                        let message = e
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid value for {}", field));
                        FieldValidationError::new(field.to_string(), message)
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        CatalogError::Validation(fields)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Internal(format!("serialization failed: {}", err))
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Upstream {
            service: "filesystem".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        CatalogError::Internal(format!("{:#}", err))
    }
}

/// A specialized Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

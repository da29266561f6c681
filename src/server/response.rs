//! Response envelopes
//!
//! Successful responses carry `success: true` plus a `data` member; listings
//! add `count` and `pagination`. Failures are rendered by
//! [`CatalogError`](crate::core::error::CatalogError).

use serde::Serialize;
use serde_json::Value;

use crate::core::query::Pagination;

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Envelope of `GET /api/v1/books`
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    /// Records in this page, not the collection size
    pub count: usize,
    pub pagination: Pagination,
    pub data: Vec<Value>,
}

impl ListResponse {
    pub fn new(data: Vec<Value>, pagination: Pagination) -> Self {
        Self {
            success: true,
            count: data.len(),
            pagination,
            data,
        }
    }
}

//! Store trait for book persistence

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::core::book::Book;
use crate::core::error::CatalogResult;
use crate::core::query::{Filter, ListingQuery};

/// Persistence for book records
///
/// Implementations enforce author uniqueness, reporting collisions as
/// [`CatalogError::DuplicateKey`](crate::core::error::CatalogError::DuplicateKey).
/// The handlers are agnostic to the underlying storage mechanism.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Short backend name used in logs and error messages
    fn backend(&self) -> &'static str;

    /// Insert a new record
    async fn insert(&self, book: Book) -> CatalogResult<Book>;

    /// Get a record by id
    async fn get(&self, id: &Uuid) -> CatalogResult<Option<Book>>;

    /// Run a listing query
    ///
    /// Applies the filter, sort order and pagination window, then the
    /// projection. Records are returned in their JSON form because a
    /// projection may drop required fields.
    async fn find(&self, query: &ListingQuery) -> CatalogResult<Vec<Value>>;

    /// Count records matching `filter`, or the whole collection for `None`
    async fn count(&self, filter: Option<&Filter>) -> CatalogResult<u64>;

    /// Replace an existing record, `NotFound` if it is gone
    async fn replace(&self, book: Book) -> CatalogResult<Book>;

    /// Delete a record; `false` if nothing was removed
    async fn delete(&self, id: &Uuid) -> CatalogResult<bool>;

    /// Delete every record, returning how many were removed
    async fn delete_all(&self) -> CatalogResult<u64>;
}

//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Provides [`MongoBookStore`], backed by a single `books` collection.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag.
//!
//! # Serialization strategy
//!
//! Records are serialized via `serde_json::Value` as an intermediate format,
//! then converted to BSON documents. UUIDs are stored as strings and
//! timestamps as fixed-width RFC 3339 strings, so string order on `createdAt`
//! is chronological order. The `id` field is mapped to MongoDB's `_id`
//! convention.
//!
//! # Query rendering
//!
//! The typed [`Filter`] is rendered into a MongoDB filter document here, and
//! only here: `gte` becomes `$gte`, `in` becomes `$in`, and so on.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use serde_json::Value;
use uuid::Uuid;

use crate::core::book::Book;
use crate::core::error::{CatalogError, CatalogResult};
use crate::core::field::{FieldValue, format_timestamp};
use crate::core::query::{
    ClauseValue, ComparisonClause, Filter, ListingQuery, Projection, SortDirection, SortSpec,
};
use crate::core::store::BookStore;

/// Collection holding the catalog
pub const BOOKS_COLLECTION: &str = "books";

const DUPLICATE_KEY_CODE: i32 = 11000;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert a serde_json::Value (expected to be an Object) into a BSON Document,
/// renaming `id` → `_id` for MongoDB convention.
fn json_to_document(json: Value) -> CatalogResult<Document> {
    let bson_val = mongodb::bson::to_bson(&json)
        .map_err(|e| storage_error(format!("Failed to convert JSON to BSON: {}", e)))?;

    let mut doc = match bson_val {
        Bson::Document(d) => d,
        _ => return Err(storage_error("Expected BSON document, got non-object")),
    };

    if let Some(id) = doc.remove("id") {
        doc.insert("_id", id);
    }

    Ok(doc)
}

/// Convert a BSON Document back into a serde_json::Value,
/// renaming `_id` → `id`.
fn document_to_json(mut doc: Document) -> Value {
    if let Some(id) = doc.remove("_id") {
        doc.insert("id", id);
    }

    Bson::Document(doc).into_relaxed_extjson()
}

fn book_to_document(book: &Book) -> CatalogResult<Document> {
    json_to_document(serde_json::to_value(book)?)
}

fn document_to_book(doc: Document) -> CatalogResult<Book> {
    Ok(serde_json::from_value(document_to_json(doc))?)
}

/// Convert a UUID to its BSON string representation for queries.
fn uuid_bson(id: &Uuid) -> Bson {
    Bson::String(id.to_string())
}

/// Public attribute path → stored path
fn stored_path(field: &str) -> &str {
    if field == "id" { "_id" } else { field }
}

fn field_value_bson(value: &FieldValue) -> Bson {
    match value {
        FieldValue::String(s) => Bson::String(s.clone()),
        FieldValue::Float(n) => Bson::Double(*n),
        FieldValue::DateTime(dt) => Bson::String(format_timestamp(dt)),
    }
}

fn clause_to_document(clause: &ComparisonClause) -> Document {
    let operand = match &clause.value {
        ClauseValue::Scalar(v) => field_value_bson(v),
        ClauseValue::List(vs) => Bson::Array(vs.iter().map(field_value_bson).collect()),
    };
    let sigil = format!("${}", clause.operator.keyword());
    doc! { stored_path(&clause.field): { sigil: operand } }
}

/// Render a typed filter as a MongoDB filter document
fn filter_to_document(filter: &Filter) -> Document {
    match filter.clauses.as_slice() {
        [] => doc! {},
        [single] => clause_to_document(single),
        many => doc! {
            "$and": many.iter().map(clause_to_document).collect::<Vec<_>>()
        },
    }
}

fn projection_to_document(projection: &Projection) -> Document {
    let mut doc = doc! { "_id": 1 };
    for field in &projection.fields {
        doc.insert(stored_path(field), 1);
    }
    doc
}

fn sort_to_document(sort: &SortSpec) -> Document {
    let mut doc = Document::new();
    for key in &sort.keys {
        let direction = match key.direction {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        };
        doc.insert(stored_path(&key.field), direction);
    }
    doc
}

fn storage_error(message: impl Into<String>) -> CatalogError {
    CatalogError::Storage {
        backend: "MongoDB".to_string(),
        message: message.into(),
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

/// Map a driver error, turning unique-index violations into `DuplicateKey`
fn write_error(context: &str, err: mongodb::error::Error) -> CatalogError {
    if is_duplicate_key(&err) {
        return CatalogError::DuplicateKey {
            field: "author".to_string(),
        };
    }
    storage_error(format!("{}: {}", context, err))
}

// ---------------------------------------------------------------------------
// MongoBookStore
// ---------------------------------------------------------------------------

/// Book storage backed by MongoDB.
///
/// # Example
///
/// ```rust,ignore
/// use mongodb::Client;
/// use catalog::storage::MongoBookStore;
///
/// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
/// let store = MongoBookStore::new(client.database("shelfkeep"));
/// store.ensure_indexes().await?;
/// ```
#[derive(Clone, Debug)]
pub struct MongoBookStore {
    database: Database,
}

impl MongoBookStore {
    /// Create a new `MongoBookStore` with the given database handle.
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Connect to `uri` and open `database_name`
    pub async fn connect(uri: &str, database_name: &str) -> CatalogResult<Self> {
        let client = mongodb::Client::with_uri_str(uri)
            .await
            .map_err(|e| storage_error(format!("Failed to connect: {}", e)))?;
        let store = Self::new(client.database(database_name));
        tracing::info!(database = database_name, "MongoDB connected");
        Ok(store)
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self) -> Collection<Document> {
        self.database.collection(BOOKS_COLLECTION)
    }

    /// Create the unique index on `author`.
    ///
    /// Idempotent, so it runs on every startup.
    pub async fn ensure_indexes(&self) -> CatalogResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "author": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection()
            .create_index(index)
            .await
            .map_err(|e| storage_error(format!("Failed to create indexes on books: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl BookStore for MongoBookStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn insert(&self, book: Book) -> CatalogResult<Book> {
        let doc = book_to_document(&book)?;

        self.collection()
            .insert_one(doc)
            .await
            .map_err(|e| write_error("Failed to insert book", e))?;

        Ok(book)
    }

    async fn get(&self, id: &Uuid) -> CatalogResult<Option<Book>> {
        let doc = self
            .collection()
            .find_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| storage_error(format!("Failed to get book: {}", e)))?;

        doc.map(document_to_book).transpose()
    }

    async fn find(&self, query: &ListingQuery) -> CatalogResult<Vec<Value>> {
        let limit = i64::try_from(query.window.limit).unwrap_or(i64::MAX);
        let mut find = self
            .collection()
            .find(filter_to_document(&query.filter))
            .sort(sort_to_document(&query.sort))
            .skip(query.window.start_index())
            .limit(limit);
        if let Some(projection) = &query.projection {
            find = find.projection(projection_to_document(projection));
        }

        let cursor = find
            .await
            .map_err(|e| storage_error(format!("Failed to list books: {}", e)))?;

        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| storage_error(format!("Failed to collect books: {}", e)))?;

        Ok(docs.into_iter().map(document_to_json).collect())
    }

    async fn count(&self, filter: Option<&Filter>) -> CatalogResult<u64> {
        let filter = filter.map(filter_to_document).unwrap_or_default();
        self.collection()
            .count_documents(filter)
            .await
            .map_err(|e| storage_error(format!("Failed to count books: {}", e)))
    }

    async fn replace(&self, book: Book) -> CatalogResult<Book> {
        let doc = book_to_document(&book)?;

        let result = self
            .collection()
            .replace_one(doc! { "_id": uuid_bson(&book.id) }, doc)
            .await
            .map_err(|e| write_error("Failed to update book", e))?;

        if result.matched_count == 0 {
            return Err(CatalogError::NotFound {
                id: book.id.to_string(),
            });
        }

        Ok(book)
    }

    async fn delete(&self, id: &Uuid) -> CatalogResult<bool> {
        let result = self
            .collection()
            .delete_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| storage_error(format!("Failed to delete book: {}", e)))?;

        Ok(result.deleted_count > 0)
    }

    async fn delete_all(&self) -> CatalogResult<u64> {
        let result = self
            .collection()
            .delete_many(doc! {})
            .await
            .map_err(|e| storage_error(format!("Failed to delete books: {}", e)))?;

        Ok(result.deleted_count)
    }
}

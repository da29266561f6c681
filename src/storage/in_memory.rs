//! In-memory implementation of BookStore for testing and development

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::core::book::Book;
use crate::core::error::{CatalogError, CatalogResult};
use crate::core::query::{Filter, ListingQuery};
use crate::core::store::BookStore;

/// In-memory book store
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
/// Filters are evaluated against each record's JSON form, so query semantics
/// match what the document store does with the same [`ListingQuery`].
#[derive(Clone, Default)]
pub struct InMemoryBookStore {
    books: Arc<RwLock<HashMap<Uuid, Book>>>,
}

impl InMemoryBookStore {
    /// Create a new in-memory book store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_error(e: impl std::fmt::Display) -> CatalogError {
        CatalogError::Storage {
            backend: "in-memory".to_string(),
            message: format!("lock poisoned: {}", e),
        }
    }

    fn author_taken(books: &HashMap<Uuid, Book>, candidate: &Book) -> bool {
        books
            .values()
            .any(|b| b.id != candidate.id && b.author == candidate.author)
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    fn backend(&self) -> &'static str {
        "in-memory"
    }

    async fn insert(&self, book: Book) -> CatalogResult<Book> {
        let mut books = self.books.write().map_err(Self::lock_error)?;

        if Self::author_taken(&books, &book) {
            return Err(CatalogError::DuplicateKey {
                field: "author".to_string(),
            });
        }
        books.insert(book.id, book.clone());

        Ok(book)
    }

    async fn get(&self, id: &Uuid) -> CatalogResult<Option<Book>> {
        let books = self.books.read().map_err(Self::lock_error)?;
        Ok(books.get(id).cloned())
    }

    async fn find(&self, query: &ListingQuery) -> CatalogResult<Vec<Value>> {
        let records: Vec<Value> = {
            let books = self.books.read().map_err(Self::lock_error)?;
            books
                .values()
                .map(serde_json::to_value)
                .collect::<Result<_, _>>()?
        };

        let mut matched: Vec<Value> = records
            .into_iter()
            .filter(|record| query.filter.matches(record))
            .collect();
        matched.sort_by(|a, b| query.sort.compare(a, b));

        let skip = usize::try_from(query.window.start_index()).unwrap_or(usize::MAX);
        let take = usize::try_from(query.window.limit).unwrap_or(usize::MAX);

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|record| match &query.projection {
                Some(projection) => projection.apply(&record),
                None => record,
            })
            .collect())
    }

    async fn count(&self, filter: Option<&Filter>) -> CatalogResult<u64> {
        let books = self.books.read().map_err(Self::lock_error)?;
        let Some(filter) = filter.filter(|f| !f.is_empty()) else {
            return Ok(books.len() as u64);
        };

        let mut total = 0u64;
        for book in books.values() {
            if filter.matches(&serde_json::to_value(book)?) {
                total += 1;
            }
        }
        Ok(total)
    }

    async fn replace(&self, book: Book) -> CatalogResult<Book> {
        let mut books = self.books.write().map_err(Self::lock_error)?;

        if !books.contains_key(&book.id) {
            return Err(CatalogError::NotFound {
                id: book.id.to_string(),
            });
        }
        if Self::author_taken(&books, &book) {
            return Err(CatalogError::DuplicateKey {
                field: "author".to_string(),
            });
        }
        books.insert(book.id, book.clone());

        Ok(book)
    }

    async fn delete(&self, id: &Uuid) -> CatalogResult<bool> {
        let mut books = self.books.write().map_err(Self::lock_error)?;
        Ok(books.remove(id).is_some())
    }

    async fn delete_all(&self) -> CatalogResult<u64> {
        let mut books = self.books.write().map_err(Self::lock_error)?;
        let removed = books.len() as u64;
        books.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::book::DEFAULT_PHOTO;
    use crate::core::query::ListingFilterRequest;
    use chrono::{Duration, TimeZone, Utc};

    fn book(author: &str, rating: f64, age_days: i64) -> Book {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        Book {
            id: Uuid::new_v4(),
            author: author.to_string(),
            slug: author.to_lowercase(),
            rating,
            description: format!("by {}", author),
            book_cost: None,
            photo: DEFAULT_PHOTO.to_string(),
            location: None,
            average_cost: None,
            created_at: base - Duration::days(age_days),
        }
    }

    async fn seeded() -> InMemoryBookStore {
        let store = InMemoryBookStore::new();
        store.insert(book("Austen", 3.0, 3)).await.unwrap();
        store.insert(book("Borges", 5.0, 2)).await.unwrap();
        store.insert(book("Calvino", 4.0, 1)).await.unwrap();
        store
    }

    fn query(pairs: &[(&str, &str)]) -> ListingQuery {
        ListingFilterRequest::from_pairs(pairs.iter().copied())
            .translate()
            .unwrap()
    }

    fn authors(records: &[Value]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r["author"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_default_order_is_newest_first() {
        let store = seeded().await;
        let records = store.find(&query(&[])).await.unwrap();
        assert_eq!(authors(&records), vec!["Calvino", "Borges", "Austen"]);
    }

    #[tokio::test]
    async fn test_filter_and_sort() {
        let store = seeded().await;
        let records = store
            .find(&query(&[("rating[gte]", "4"), ("sort", "rating")]))
            .await
            .unwrap();
        assert_eq!(authors(&records), vec!["Calvino", "Borges"]);
    }

    #[tokio::test]
    async fn test_window_and_projection() {
        let store = seeded().await;
        let records = store
            .find(&query(&[
                ("select", "author"),
                ("sort", "author"),
                ("page", "2"),
                ("limit", "2"),
            ]))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["author"], "Calvino");
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(records[0].get("id").is_some());
    }

    #[tokio::test]
    async fn test_count_whole_and_filtered() {
        let store = seeded().await;
        let filter = query(&[("rating[lt]", "5")]).filter;
        assert_eq!(store.count(None).await.unwrap(), 3);
        assert_eq!(store.count(Some(&filter)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_author_rejected() {
        let store = seeded().await;
        let err = store.insert(book("Borges", 1.0, 0)).await.unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateKey {
                field: "author".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_replace_missing_is_not_found() {
        let store = InMemoryBookStore::new();
        let err = store.replace(book("Nobody", 1.0, 0)).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let store = seeded().await;
        let first = store.find(&query(&[])).await.unwrap();
        let id: Uuid = first[0]["id"].as_str().unwrap().parse().unwrap();

        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert_eq!(store.count(None).await.unwrap(), 0);
    }
}

//! Shared contract suite for `BookStore` backends
//!
//! ```rust,ignore
//! #[macro_use]
//! mod store_contract;
//! use store_contract::*;
//!
//! book_store_tests!(InMemoryBookStore::new());
//! ```

#![allow(dead_code)]

use chrono::{Duration, Utc};
use uuid::Uuid;

use catalog::core::book::{Book, DEFAULT_PHOTO, Location};
use catalog::core::hooks::slugify;
use catalog::core::query::{ListingFilterRequest, ListingQuery};

/// Book created `age_minutes` ago in `city`
pub fn book(author: &str, rating: f64, city: &str, age_minutes: i64) -> Book {
    Book {
        id: Uuid::new_v4(),
        author: author.to_string(),
        slug: slugify(author),
        rating,
        description: format!("Collected works of {}", author),
        book_cost: None,
        photo: DEFAULT_PHOTO.to_string(),
        location: Some(Location {
            kind: "Point".to_string(),
            coordinates: vec![0.0, 0.0],
            city: Some(city.to_string()),
            ..Default::default()
        }),
        average_cost: Some(rating * 2.0),
        created_at: Utc::now() - Duration::minutes(age_minutes),
    }
}

/// Five books, newest first: Delany, Lispector, Borges, Chiang, Carson
pub fn library() -> Vec<Book> {
    vec![
        book("Anne Carson", 6.0, "Toronto", 50),
        book("Ted Chiang", 9.0, "Port Jefferson", 40),
        book("Jorge Luis Borges", 8.0, "Buenos Aires", 30),
        book("Clarice Lispector", 7.0, "Rio de Janeiro", 20),
        book("Samuel Delany", 4.0, "New York", 10),
    ]
}

pub fn query(pairs: &[(&str, &str)]) -> ListingQuery {
    ListingFilterRequest::from_pairs(pairs.iter().copied())
        .translate()
        .unwrap()
}

pub fn authors(records: &[serde_json::Value]) -> Vec<String> {
    records
        .iter()
        .map(|r| r["author"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Generate the `BookStore` contract suite for a store factory expression
#[macro_export]
macro_rules! book_store_tests {
    ($factory:expr) => {
        mod book_store_contract {
            use super::*;
            use catalog::core::error::CatalogError;
            use catalog::core::store::BookStore;

            async fn seeded() -> impl BookStore {
                let store = $factory;
                for b in library() {
                    store.insert(b).await.unwrap();
                }
                store
            }

            #[tokio::test]
            async fn test_insert_and_get() {
                let store = $factory;
                let original = book("Italo Calvino", 8.5, "Sanremo", 0);
                let id = original.id;
                store.insert(original.clone()).await.unwrap();

                let fetched = store.get(&id).await.unwrap().unwrap();
                assert_eq!(fetched.author, original.author);
                assert_eq!(fetched.slug, "italo-calvino");
                assert_eq!(fetched.rating, 8.5);
                assert_eq!(
                    fetched.location.and_then(|l| l.city),
                    Some("Sanremo".to_string())
                );
                assert!(store.get(&uuid::Uuid::new_v4()).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_duplicate_author_rejected() {
                let store = $factory;
                store.insert(book("Iain Banks", 8.0, "Fife", 0)).await.unwrap();

                let err = store
                    .insert(book("Iain Banks", 3.0, "Glasgow", 0))
                    .await
                    .unwrap_err();
                assert!(matches!(err, CatalogError::DuplicateKey { .. }));
                assert_eq!(store.count(None).await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_replace() {
                let store = $factory;
                let mut b = book("Stanisław Lem", 8.0, "Lviv", 0);
                store.insert(b.clone()).await.unwrap();

                b.rating = 9.5;
                b.photo = format!("photo_{}.jpg", b.id);
                store.replace(b.clone()).await.unwrap();

                let fetched = store.get(&b.id).await.unwrap().unwrap();
                assert_eq!(fetched.rating, 9.5);
                assert_eq!(fetched.photo, b.photo);

                let missing = book("Nobody", 1.0, "Nowhere", 0);
                let err = store.replace(missing).await.unwrap_err();
                assert!(matches!(err, CatalogError::NotFound { .. }));
            }

            #[tokio::test]
            async fn test_delete() {
                let store = $factory;
                let b = book("Ursula K. Le Guin", 9.0, "Berkeley", 0);
                store.insert(b.clone()).await.unwrap();

                assert!(store.delete(&b.id).await.unwrap());
                assert!(!store.delete(&b.id).await.unwrap());
                assert!(store.get(&b.id).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_find_default_order_newest_first() {
                let store = seeded().await;
                let records = store.find(&query(&[])).await.unwrap();
                assert_eq!(
                    authors(&records),
                    vec![
                        "Samuel Delany",
                        "Clarice Lispector",
                        "Jorge Luis Borges",
                        "Ted Chiang",
                        "Anne Carson"
                    ]
                );
            }

            #[tokio::test]
            async fn test_find_comparison_filter() {
                let store = seeded().await;
                let records = store
                    .find(&query(&[("rating[gte]", "8"), ("sort", "-rating")]))
                    .await
                    .unwrap();
                assert_eq!(authors(&records), vec!["Ted Chiang", "Jorge Luis Borges"]);

                let records = store
                    .find(&query(&[("averageCost[lt]", "10"), ("sort", "rating")]))
                    .await
                    .unwrap();
                assert_eq!(authors(&records), vec!["Samuel Delany"]);
            }

            #[tokio::test]
            async fn test_find_nested_and_membership_filters() {
                let store = seeded().await;
                let records = store
                    .find(&query(&[("location[city]", "Toronto")]))
                    .await
                    .unwrap();
                assert_eq!(authors(&records), vec!["Anne Carson"]);

                let records = store
                    .find(&query(&[
                        ("location[city][in]", "Toronto,New York,Lisbon"),
                        ("sort", "author"),
                    ]))
                    .await
                    .unwrap();
                assert_eq!(authors(&records), vec!["Anne Carson", "Samuel Delany"]);
            }

            #[tokio::test]
            async fn test_find_window() {
                let store = seeded().await;
                let records = store
                    .find(&query(&[("sort", "rating"), ("page", "2"), ("limit", "2")]))
                    .await
                    .unwrap();
                assert_eq!(authors(&records), vec!["Clarice Lispector", "Jorge Luis Borges"]);

                let past_end = store
                    .find(&query(&[("page", "9"), ("limit", "2")]))
                    .await
                    .unwrap();
                assert!(past_end.is_empty());
            }

            #[tokio::test]
            async fn test_find_projection_keeps_id() {
                let store = seeded().await;
                let records = store
                    .find(&query(&[("select", "author,location.city"), ("limit", "1")]))
                    .await
                    .unwrap();

                let first = records[0].as_object().unwrap();
                let mut keys: Vec<&str> = first.keys().map(String::as_str).collect();
                keys.sort();
                assert_eq!(keys, vec!["author", "id", "location"]);
                assert_eq!(records[0]["location"]["city"], "New York");
                assert!(records[0]["location"].get("type").is_none());
            }

            #[tokio::test]
            async fn test_count() {
                let store = seeded().await;
                assert_eq!(store.count(None).await.unwrap(), 5);

                let q = query(&[("rating[gt]", "6"), ("rating[lt]", "9")]);
                assert_eq!(store.count(Some(&q.filter)).await.unwrap(), 2);
            }

            #[tokio::test]
            async fn test_delete_all() {
                let store = seeded().await;
                assert_eq!(store.delete_all().await.unwrap(), 5);
                assert_eq!(store.count(None).await.unwrap(), 0);
            }
        }
    };
}

//! Bulk import and removal of catalog data

use anyhow::{Context, Result};
use std::path::Path;

use crate::core::book::NewBook;
use crate::core::geocoder::Geocoder;
use crate::core::hooks::prepare_new_book;
use crate::core::store::BookStore;

/// Read a JSON array of create payloads
pub fn read_seed_file(path: &Path) -> Result<Vec<NewBook>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Create every payload through the same hooks the API uses
///
/// Stops at the first failure; records inserted before it stay in place.
pub async fn import_books(
    store: &dyn BookStore,
    geocoder: &dyn Geocoder,
    payloads: Vec<NewBook>,
) -> Result<usize> {
    let mut imported = 0;
    for (index, payload) in payloads.into_iter().enumerate() {
        let author = payload.author.clone().unwrap_or_default();
        let book = prepare_new_book(payload, geocoder)
            .await
            .with_context(|| format!("record {} ({})", index, author))?;
        store
            .insert(book)
            .await
            .with_context(|| format!("inserting record {} ({})", index, author))?;
        imported += 1;
    }
    tracing::info!(imported, backend = store.backend(), "data imported");
    Ok(imported)
}

/// Remove every book
pub async fn destroy_books(store: &dyn BookStore) -> Result<u64> {
    let removed = store.delete_all().await?;
    tracing::info!(removed, backend = store.backend(), "data destroyed");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geocoder::FixedGeocoder;
    use crate::storage::InMemoryBookStore;
    use std::io::Write;

    const SEED: &str = r#"[
        {"author": "Mary Shelley", "rating": 7, "description": "Frankenstein", "address": "London"},
        {"author": "Bram Stoker", "rating": 6.5, "description": "Dracula", "address": "Dublin", "averageCost": 12}
    ]"#;

    #[tokio::test]
    async fn test_import_and_destroy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();

        let payloads = read_seed_file(file.path()).unwrap();
        let store = InMemoryBookStore::new();
        let imported = import_books(&store, &FixedGeocoder::echo(), payloads)
            .await
            .unwrap();
        assert_eq!(imported, 2);
        assert_eq!(store.count(None).await.unwrap(), 2);

        assert_eq!(destroy_books(&store).await.unwrap(), 2);
        assert_eq!(store.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_stops_on_duplicate() {
        let payloads: Vec<NewBook> = serde_json::from_str(SEED).unwrap();
        let mut doubled = payloads.clone();
        doubled.extend(payloads);

        let store = InMemoryBookStore::new();
        let err = import_books(&store, &FixedGeocoder::echo(), doubled)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Duplicate field value entered"));
        assert_eq!(store.count(None).await.unwrap(), 2);
    }

    #[test]
    fn test_read_seed_file_missing() {
        assert!(read_seed_file(Path::new("/definitely/not/here.json")).is_err());
    }
}

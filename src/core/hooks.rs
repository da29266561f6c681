//! Pre-persist hooks: slug derivation, geocoding and validation
//!
//! Every write path (create, update, seeding) goes through these functions so
//! the stored record always carries a slug matching its author and a location
//! resolved from the last supplied address.

use chrono::Utc;
use deunicode::deunicode;
use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;
use validator::Validate;

use crate::core::book::{Book, BookPatch, DEFAULT_PHOTO, Location, NewBook};
use crate::core::error::{CatalogError, CatalogResult};
use crate::core::geocoder::Geocoder;

/// URL-safe lowercase form of `text`
///
/// Non-ASCII letters are transliterated first (`García` → `garcia`). Runs of
/// anything other than ASCII letters and digits then collapse into a single
/// `-`; leading and trailing dashes are dropped.
pub fn slugify(text: &str) -> String {
    static NON_ALPHANUMERIC: OnceLock<Regex> = OnceLock::new();
    let regex = NON_ALPHANUMERIC.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap());
    let lower = deunicode(text).to_lowercase();
    regex
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

async fn resolve_location(geocoder: &dyn Geocoder, address: &str) -> CatalogResult<Location> {
    match geocoder.geocode(address).await? {
        Some(found) => Ok(found.into()),
        None => Err(CatalogError::field(
            "address",
            format!("Could not geocode address '{}'", address),
        )),
    }
}

/// Turn a create payload into a record ready for insertion
pub async fn prepare_new_book(payload: NewBook, geocoder: &dyn Geocoder) -> CatalogResult<Book> {
    payload.validate()?;

    // validate() guarantees the required fields are present
    let (Some(author), Some(rating), Some(description), Some(address)) = (
        payload.author,
        payload.rating,
        payload.description,
        payload.address,
    ) else {
        return Err(CatalogError::Internal(
            "validated payload is missing required fields".to_string(),
        ));
    };

    let location = resolve_location(geocoder, &address).await?;

    let book = Book {
        id: Uuid::new_v4(),
        slug: slugify(&author),
        author,
        rating,
        description,
        book_cost: payload.book_cost,
        photo: payload.photo.unwrap_or_else(|| DEFAULT_PHOTO.to_string()),
        location: Some(location),
        average_cost: payload.average_cost,
        created_at: Utc::now(),
    };
    book.validate()?;
    Ok(book)
}

/// Merge a partial update into an existing record
///
/// The slug follows the author; a supplied address is re-geocoded. The merged
/// record is validated again before it is returned.
pub async fn apply_patch(
    mut book: Book,
    patch: BookPatch,
    geocoder: &dyn Geocoder,
) -> CatalogResult<Book> {
    if let Some(author) = patch.author
        && author != book.author
    {
        book.slug = slugify(&author);
        book.author = author;
    }
    if let Some(rating) = patch.rating {
        book.rating = rating;
    }
    if let Some(description) = patch.description {
        book.description = description;
    }
    if patch.book_cost.is_some() {
        book.book_cost = patch.book_cost;
    }
    if let Some(photo) = patch.photo {
        book.photo = photo;
    }
    if patch.average_cost.is_some() {
        book.average_cost = patch.average_cost;
    }
    if let Some(address) = patch.address {
        if address.trim().is_empty() {
            return Err(CatalogError::field("address", "Please add an address"));
        }
        book.location = Some(resolve_location(geocoder, &address).await?);
    }

    book.validate()?;
    Ok(book)
}

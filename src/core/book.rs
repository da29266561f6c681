//! The book listing record and its request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::field::{FieldKind, timestamp};

/// Placeholder photo filename used until a photo is uploaded
pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

/// Field used for the default listing order
pub const CREATED_AT: &str = "createdAt";

/// A catalog listing as stored and returned by the API
///
/// JSON field names are camelCase. `address` is never stored: it is consumed
/// by geocoding and replaced by [`Location`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,

    #[validate(length(min = 1, message = "Please add an author"))]
    pub author: String,

    pub slug: String,

    pub rating: f64,

    #[validate(length(min = 1, message = "Please add a description"))]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_cost: Option<f64>,

    #[serde(default = "default_photo")]
    pub photo: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_cost: Option<f64>,

    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_photo() -> String {
    DEFAULT_PHOTO.to_string()
}

/// GeoJSON point plus address components produced by geocoding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,

    /// `[longitude, latitude]`
    pub coordinates: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

impl Book {
    /// Declared kind of a (possibly dotted) attribute path
    ///
    /// Returns `None` for paths the record does not declare; the query
    /// translator keeps their values as text.
    pub fn field_kind(path: &str) -> Option<FieldKind> {
        match path {
            "id" | "author" | "slug" | "description" | "photo" => Some(FieldKind::Text),
            "rating" | "bookCost" | "averageCost" => Some(FieldKind::Number),
            CREATED_AT => Some(FieldKind::Timestamp),
            "location.type"
            | "location.formattedAddress"
            | "location.street"
            | "location.city"
            | "location.state"
            | "location.zipcode"
            | "location.country"
            | "location.countryCode" => Some(FieldKind::Text),
            "location.coordinates" => Some(FieldKind::Number),
            _ => None,
        }
    }
}

/// Payload accepted by `POST /api/v1/books`
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    #[validate(
        required(message = "Please add an author"),
        length(min = 1, message = "Please add an author")
    )]
    pub author: Option<String>,

    #[validate(required(message = "Please add a rating"))]
    pub rating: Option<f64>,

    #[validate(
        required(message = "Please add a description"),
        length(min = 1, message = "Please add a description")
    )]
    pub description: Option<String>,

    pub book_cost: Option<f64>,

    #[validate(
        required(message = "Please add an address"),
        length(min = 1, message = "Please add an address")
    )]
    pub address: Option<String>,

    pub photo: Option<String>,

    pub average_cost: Option<f64>,
}

/// Partial update accepted by `PUT /api/v1/books/{id}`
///
/// Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub book_cost: Option<f64>,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub average_cost: Option<f64>,
}

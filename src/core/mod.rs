//! Core module containing the catalog's domain types and traits

pub mod auth;
pub mod book;
pub mod error;
pub mod field;
pub mod geocoder;
pub mod hooks;
pub mod query;
pub mod store;
pub mod upload;

pub use auth::{AuthContext, AuthPolicy, AuthProvider, JwtAuthProvider};
pub use book::{Book, BookPatch, Location, NewBook};
pub use error::{CatalogError, CatalogResult};
pub use field::{FieldKind, FieldValue};
pub use geocoder::{FixedGeocoder, GeocodedAddress, Geocoder, MapQuestGeocoder};
pub use query::{ListingFilterRequest, ListingQuery, Pagination, PaginationWindow};
pub use store::BookStore;
pub use upload::{PhotoUpload, UploadError};

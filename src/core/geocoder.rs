//! Address geocoding
//!
//! [`Geocoder`] is the seam to the external geocoding service. The server
//! uses [`MapQuestGeocoder`] in production and [`FixedGeocoder`] for local
//! development and tests.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{GeocoderConfig, GeocoderProvider};
use crate::core::book::Location;
use crate::core::error::{CatalogError, CatalogResult};

/// Structured result of resolving a free-text address
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodedAddress {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: Option<String>,
    pub street_name: Option<String>,
    pub city: Option<String>,
    pub state_code: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
}

impl From<GeocodedAddress> for Location {
    fn from(geo: GeocodedAddress) -> Self {
        Location {
            kind: "Point".to_string(),
            coordinates: vec![geo.longitude, geo.latitude],
            formatted_address: geo.formatted_address,
            street: geo.street_name,
            city: geo.city,
            state: geo.state_code,
            zipcode: geo.zipcode,
            country: geo.country,
            country_code: geo.country_code,
        }
    }
}

/// Resolves addresses into coordinates and components
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// First match for `address`, or `None` if the service found nothing
    async fn geocode(&self, address: &str) -> CatalogResult<Option<GeocodedAddress>>;
}

/// Build the geocoder selected by configuration
pub fn from_config(config: &GeocoderConfig) -> CatalogResult<Arc<dyn Geocoder>> {
    match config.provider {
        GeocoderProvider::MapQuest => {
            let key = config.api_key.as_deref().ok_or_else(|| {
                CatalogError::Internal("GEOCODER_API_KEY is required for mapquest".to_string())
            })?;
            let mut geocoder = MapQuestGeocoder::new(key)?;
            if let Some(endpoint) = &config.endpoint {
                geocoder = geocoder.with_endpoint(endpoint.clone());
            }
            Ok(Arc::new(geocoder))
        }
        GeocoderProvider::Echo => Ok(Arc::new(FixedGeocoder::echo())),
    }
}

// ---------------------------------------------------------------------------
// MapQuest
// ---------------------------------------------------------------------------

const MAPQUEST_ENDPOINT: &str = "https://www.mapquestapi.com/geocoding/v1/address";

/// Geocoder backed by the MapQuest geocoding API
#[derive(Clone, Debug)]
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl MapQuestGeocoder {
    pub fn new(api_key: impl Into<String>) -> CatalogResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| upstream(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: MAPQUEST_ENDPOINT.to_string(),
        })
    }

    /// Point at a different endpoint (proxies, test servers)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: MapQuestLatLng,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    admin_area5: Option<String>,
    #[serde(default)]
    admin_area3: Option<String>,
    #[serde(default)]
    admin_area1: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

impl From<MapQuestLocation> for GeocodedAddress {
    fn from(loc: MapQuestLocation) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let street_name = non_empty(loc.street);
        let city = non_empty(loc.admin_area5);
        let state_code = non_empty(loc.admin_area3);
        let zipcode = non_empty(loc.postal_code);
        let country_code = non_empty(loc.admin_area1);

        let state_zip = [state_code.as_deref(), zipcode.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let parts: Vec<&str> = [
            street_name.as_deref(),
            city.as_deref(),
            Some(state_zip.as_str()).filter(|s| !s.is_empty()),
            country_code.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        GeocodedAddress {
            latitude: loc.lat_lng.lat,
            longitude: loc.lat_lng.lng,
            formatted_address: (!parts.is_empty()).then(|| parts.join(", ")),
            street_name,
            city,
            state_code,
            zipcode,
            country: country_code.clone(),
            country_code,
        }
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> CatalogResult<Option<GeocodedAddress>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("key", self.api_key.as_str()), ("location", address)])
            .send()
            .await
            .map_err(|e| upstream(e.to_string()))?
            .error_for_status()
            .map_err(|e| upstream(e.to_string()))?;

        let body: MapQuestResponse = response.json().await.map_err(|e| upstream(e.to_string()))?;

        let first = body
            .results
            .into_iter()
            .flat_map(|r| r.locations)
            .next()
            .map(GeocodedAddress::from);

        tracing::debug!(address, found = first.is_some(), "geocoded address");
        Ok(first)
    }
}

fn upstream(message: String) -> CatalogError {
    CatalogError::Upstream {
        service: "geocoder".to_string(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Fixed
// ---------------------------------------------------------------------------

/// Geocoder answering without network access
///
/// - [`FixedGeocoder::echo`] returns a point at the origin whose formatted
///   address is the input itself (local development without an API key).
/// - [`FixedGeocoder::returning`] always returns the given result.
/// - [`FixedGeocoder::not_found`] never finds anything.
#[derive(Clone, Debug)]
pub struct FixedGeocoder {
    mode: FixedMode,
}

#[derive(Clone, Debug)]
enum FixedMode {
    Echo,
    Returning(Option<GeocodedAddress>),
}

impl FixedGeocoder {
    pub fn echo() -> Self {
        Self {
            mode: FixedMode::Echo,
        }
    }

    pub fn returning(result: GeocodedAddress) -> Self {
        Self {
            mode: FixedMode::Returning(Some(result)),
        }
    }

    pub fn not_found() -> Self {
        Self {
            mode: FixedMode::Returning(None),
        }
    }
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, address: &str) -> CatalogResult<Option<GeocodedAddress>> {
        Ok(match &self.mode {
            FixedMode::Echo => Some(GeocodedAddress {
                formatted_address: Some(address.trim().to_string()),
                ..Default::default()
            }),
            FixedMode::Returning(result) => result.clone(),
        })
    }
}

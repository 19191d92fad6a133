// Reverse geocoding against a Nominatim-compatible endpoint
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const NOMINATIM_BASE: &str = "https://nominatim.openstreetmap.org";

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Coordinates out of range: lat {lat}, lon {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("Geocoder returned status {0}")]
    RequestFailed(u16),

    #[error("No address found for this location: {0}")]
    NoResult(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GeocodeError>;

#[derive(Debug, Clone, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    #[serde(default)]
    address: NominatimAddress,
    error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct NominatimAddress {
    road: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    postcode: Option<String>,
}

/// Human-readable place for a coordinate pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
    pub road: Option<String>,
    /// City, falling back to town and then village
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub postcode: Option<String>,
}

pub struct GeocodeClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeocodeClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(NOMINATIM_BASE.to_string(), timeout)
    }

    pub fn with_base_url(base_url: String, timeout: Duration) -> Result<Self> {
        // Nominatim's usage policy requires an identifying User-Agent
        let client = reqwest::Client::builder()
            .user_agent("Grapevine/0.1.0")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn reverse(&self, lat: f64, lon: f64) -> Result<Place> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(GeocodeError::InvalidCoordinates { lat, lon });
        }

        let url = format!("{}/reverse", self.base_url);
        let lat_param = lat.to_string();
        let lon_param = lon.to_string();
        debug!("Reverse geocoding {}, {}", lat, lon);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("lat", lat_param.as_str()),
                ("lon", lon_param.as_str()),
                ("zoom", "18"),
                ("addressdetails", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::RequestFailed(response.status().as_u16()));
        }

        let body = response.text().await?;
        let parsed: ReverseResponse = serde_json::from_str(&body)?;

        if let Some(error) = parsed.error {
            return Err(GeocodeError::NoResult(error));
        }

        let address = parsed.address;
        Ok(Place {
            latitude: lat,
            longitude: lon,
            display_name: parsed.display_name.unwrap_or_default(),
            road: address.road,
            city: address.city.or(address.town).or(address.village),
            region: address.state,
            country: address.country,
            country_code: address.country_code,
            postcode: address.postcode,
        })
    }
}

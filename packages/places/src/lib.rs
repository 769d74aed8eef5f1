#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Venue lookup around a locality center.
//!
//! A [`VenueLookup`] finds venues matching a set of keywords within a
//! radius of a point. A [`PlaceGeocoder`] resolves a free-text address to
//! coordinates. [`google`] implements both with the Google Maps web
//! services.

pub mod google;

use serde::Serialize;
use surfaced_report_models::Location;
use surfaced_venue_models::Venue;
use thiserror::Error;

/// Default search radius around a locality center.
pub const DEFAULT_RADIUS_METERS: u32 = 3000;

/// Errors from venue lookups.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// The provider's usage quota is exhausted.
    #[error("Places API quota exceeded. Please check your usage limits.")]
    QuotaExceeded,

    /// The provider refused the request (bad key or missing permission).
    #[error("Places API request denied: {message}")]
    RequestDenied {
        /// Provider's explanation, if any.
        message: String,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider answered with an unexpected status.
    #[error("Places API returned {status}: {message}")]
    Status {
        /// Status reported by the provider.
        status: String,
        /// Description.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Finds venues near a point.
#[async_trait::async_trait]
pub trait VenueLookup: Send + Sync {
    /// Returns at most `limit` venues within `radius_meters` of `center`
    /// matching `search_terms`. Finding nothing is `Ok(vec![])`.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::QuotaExceeded`] or
    /// [`PlacesError::RequestDenied`] when the provider refuses service,
    /// or another [`PlacesError`] if the request fails.
    async fn lookup_venues(
        &self,
        center: Location,
        search_terms: &[String],
        radius_meters: u32,
        limit: usize,
    ) -> Result<Vec<Venue>, PlacesError>;
}

/// A resolved address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodedPlace {
    /// The provider's canonical form of the address.
    pub formatted_address: String,
    pub coordinates: Location,
}

/// Resolves addresses to coordinates.
#[async_trait::async_trait]
pub trait PlaceGeocoder: Send + Sync {
    /// Returns the best match for `address`, or `None` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError`] if the provider refuses service or the
    /// request fails.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedPlace>, PlacesError>;
}

fn google_provider_from_env() -> Result<google::GooglePlacesProvider, PlacesError> {
    let api_key = std::env::var("GOOGLE_MAPS_API_KEY").map_err(|_| PlacesError::Config {
        message: "GOOGLE_MAPS_API_KEY environment variable not set".to_string(),
    })?;
    google::GooglePlacesProvider::new(api_key)
}

/// Creates a venue lookup from environment variables.
///
/// Reads `GOOGLE_MAPS_API_KEY`.
///
/// # Errors
///
/// Returns [`PlacesError::Config`] if the key is not set, or
/// [`PlacesError::Http`] if the HTTP client cannot be built.
pub fn create_lookup_from_env() -> Result<Box<dyn VenueLookup>, PlacesError> {
    Ok(Box::new(google_provider_from_env()?))
}

/// Creates an address geocoder from environment variables.
///
/// Reads `GOOGLE_MAPS_API_KEY`.
///
/// # Errors
///
/// Returns [`PlacesError::Config`] if the key is not set, or
/// [`PlacesError::Http`] if the HTTP client cannot be built.
pub fn create_geocoder_from_env() -> Result<Box<dyn PlaceGeocoder>, PlacesError> {
    Ok(Box::new(google_provider_from_env()?))
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Natural-language venue search and place lookup.
//!
//! [`search`] asks a [`LocalitySuggester`] where to look, then fans out
//! venue lookups around each suggested locality and caps the merged result.
//! Suggestion must produce at least one locality before any lookup starts.
//!
//! [`run_query`] dispatches a search box query: bare place names are
//! geocoded with [`locate_place`], everything else goes through [`search`].

pub mod aggregate;

use serde::Serialize;
use surfaced_ai::{AiError, LocalitySuggester, QueryKind, classify_query, fallback};
use surfaced_places::{GeocodedPlace, PlaceGeocoder, PlacesError, VenueLookup};
use surfaced_report_models::Location;
use surfaced_venue_models::{LocalitySuggestions, VenueSearchResult, total_venues};
use thiserror::Error;

pub use aggregate::{AggregateOptions, Aggregation, FailureKind, LookupFailure, aggregate_venues};

/// Zoom level when focusing on a single venue.
pub const VENUE_FOCUS_ZOOM: u8 = 14;

/// Zoom level when focusing on a locality with no venues.
pub const LOCALITY_FOCUS_ZOOM: u8 = 13;

/// Zoom level when focusing on a geocoded place.
pub const PLACE_FOCUS_ZOOM: u8 = 15;

/// Appended to bare place names so they resolve inside the city.
pub const CITY_SUFFIX: &str = ", Bengaluru, India";

/// Errors from [`search`].
#[derive(Debug, Error)]
pub enum SearchError {
    /// The suggester returned no localities.
    #[error("No locations found for '{query}'. Try rephrasing your search.")]
    NoLocalities {
        /// The query as typed.
        query: String,
    },

    /// Locality suggestion failed and no fallback applied.
    #[error("Failed to process location query: {0}")]
    Suggestion(#[from] AiError),

    /// A place name resolved to nothing.
    #[error("Location not found: {query}")]
    PlaceNotFound {
        /// The query as typed.
        query: String,
    },

    /// Geocoding a place name failed.
    #[error("Failed to look up place: {0}")]
    Geocode(#[from] PlacesError),
}

/// Where the map should move after a search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapFocus {
    pub center: Location,
    pub zoom: u8,
}

/// Everything a search produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// Localities the venues were searched around.
    pub suggestions: LocalitySuggestions,
    /// Tagged, capped venue groups.
    pub groups: Vec<VenueSearchResult>,
    /// Localities whose lookup failed.
    pub failures: Vec<LookupFailure>,
    /// Venues found before capping.
    pub total_found: usize,
    pub focus: MapFocus,
}

/// A place name resolved to a point on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceOutcome {
    pub query: String,
    pub place: GeocodedPlace,
    pub focus: MapFocus,
}

/// Result of [`run_query`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryOutcome {
    Place(PlaceOutcome),
    Venues(SearchOutcome),
}

/// Handles a search box query: bare place names are geocoded, anything
/// else runs the full venue [`search`].
///
/// # Errors
///
/// Returns the [`SearchError`] of whichever path ran.
pub async fn run_query(
    suggester: &dyn LocalitySuggester,
    lookup: &dyn VenueLookup,
    geocoder: &dyn PlaceGeocoder,
    query: &str,
    options: &AggregateOptions,
) -> Result<QueryOutcome, SearchError> {
    match classify_query(query) {
        QueryKind::Basic => locate_place(geocoder, query).await.map(QueryOutcome::Place),
        QueryKind::NaturalLanguage => search(suggester, lookup, query, options)
            .await
            .map(QueryOutcome::Venues),
    }
}

/// Geocodes a place name within the city and focuses the map on it.
///
/// # Errors
///
/// Returns [`SearchError::PlaceNotFound`] if nothing matched, or
/// [`SearchError::Geocode`] if the lookup failed.
pub async fn locate_place(
    geocoder: &dyn PlaceGeocoder,
    query: &str,
) -> Result<PlaceOutcome, SearchError> {
    let query = query.trim();
    log::info!("Looking up place: {query}");

    let Some(place) = geocoder.geocode(&format!("{query}{CITY_SUFFIX}")).await? else {
        return Err(SearchError::PlaceNotFound {
            query: query.to_string(),
        });
    };

    Ok(PlaceOutcome {
        query: query.to_string(),
        focus: MapFocus {
            center: place.coordinates,
            zoom: PLACE_FOCUS_ZOOM,
        },
        place,
    })
}

/// Runs a natural-language venue search.
///
/// If the suggester's reply can't be interpreted, a canned answer from the
/// [`fallback`] table is used when the query matches one.
///
/// # Errors
///
/// Returns [`SearchError::Suggestion`] if suggestion fails without a
/// fallback, or [`SearchError::NoLocalities`] if it yields no localities.
pub async fn search(
    suggester: &dyn LocalitySuggester,
    lookup: &dyn VenueLookup,
    query: &str,
    options: &AggregateOptions,
) -> Result<SearchOutcome, SearchError> {
    log::info!("Processing natural language query: {query}");

    let suggestions = match suggester.suggest_localities(query).await {
        Ok(suggestions) => suggestions,
        Err(AiError::Format { message }) => {
            log::warn!("Unreadable locality suggestions ({message}), checking fallbacks");
            fallback::fallback_for(query).ok_or(AiError::Format { message })?
        }
        Err(e) => return Err(e.into()),
    };

    let Some(first_locality) = suggestions.locations.first() else {
        return Err(SearchError::NoLocalities {
            query: query.to_string(),
        });
    };
    let locality_focus = MapFocus {
        center: first_locality.coordinates,
        zoom: LOCALITY_FOCUS_ZOOM,
    };

    let Aggregation {
        groups,
        raw_groups,
        failures,
    } = aggregate_venues(
        lookup,
        &suggestions.locations,
        &suggestions.search_terms,
        options,
    )
    .await;

    let total_found = total_venues(&raw_groups);
    if total_found == 0 {
        log::warn!("No venues found in any suggested locality");
    }

    let focus = raw_groups
        .first()
        .and_then(|group| group.venues.first())
        .map_or(locality_focus, |venue| MapFocus {
            center: venue.coordinates,
            zoom: VENUE_FOCUS_ZOOM,
        });

    Ok(SearchOutcome {
        suggestions,
        groups,
        failures,
        total_found,
        focus,
    })
}

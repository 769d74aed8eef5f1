//! Venue aggregation across suggested localities.
//!
//! Lookups for all localities run concurrently. A locality whose lookup
//! fails or times out contributes an empty group and a [`LookupFailure`];
//! it never fails the whole aggregation. The merged groups are then tagged
//! with their locality name and capped to a global venue budget.

use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use surfaced_places::{DEFAULT_RADIUS_METERS, PlacesError, VenueLookup};
use surfaced_venue_models::{LocalitySuggestion, VenueSearchResult};

/// Venues requested per locality.
pub const DEFAULT_VENUES_PER_LOCALITY: usize = 4;

/// Maximum venues kept across all localities.
pub const MAX_TOTAL_VENUES: usize = 10;

/// Time allowed for one locality's lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Tuning for [`aggregate_venues`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    pub venues_per_locality: usize,
    pub max_total_venues: usize,
    pub radius_meters: u32,
    pub lookup_timeout: Duration,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            venues_per_locality: DEFAULT_VENUES_PER_LOCALITY,
            max_total_venues: MAX_TOTAL_VENUES,
            radius_meters: DEFAULT_RADIUS_METERS,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

/// Why a locality's lookup produced no venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    QuotaExceeded,
    RequestDenied,
    TimedOut,
    Other,
}

/// A locality whose lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupFailure {
    pub locality: String,
    pub kind: FailureKind,
    pub message: String,
}

impl LookupFailure {
    fn from_error(locality: &str, error: &PlacesError) -> Self {
        let kind = match error {
            PlacesError::QuotaExceeded => FailureKind::QuotaExceeded,
            PlacesError::RequestDenied { .. } => FailureKind::RequestDenied,
            _ => FailureKind::Other,
        };
        Self {
            locality: locality.to_string(),
            kind,
            message: error.to_string(),
        }
    }
}

/// Result of [`aggregate_venues`].
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Tagged, capped groups with empty ones removed, in locality order.
    pub groups: Vec<VenueSearchResult>,
    /// One group per locality as returned by the lookups, before tagging
    /// and capping.
    pub raw_groups: Vec<VenueSearchResult>,
    /// Localities whose lookup failed, in locality order.
    pub failures: Vec<LookupFailure>,
}

/// Looks up venues around every locality concurrently and merges the
/// results.
pub async fn aggregate_venues(
    lookup: &dyn VenueLookup,
    localities: &[LocalitySuggestion],
    search_terms: &[String],
    options: &AggregateOptions,
) -> Aggregation {
    log::info!(
        "Searching venues in {} localit{}: {}",
        localities.len(),
        if localities.len() == 1 { "y" } else { "ies" },
        localities
            .iter()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let lookups = localities.iter().map(|locality| async move {
        let result = tokio::time::timeout(
            options.lookup_timeout,
            lookup.lookup_venues(
                locality.coordinates,
                search_terms,
                options.radius_meters,
                options.venues_per_locality,
            ),
        )
        .await;
        (locality, result)
    });

    let mut raw_groups = Vec::with_capacity(localities.len());
    let mut failures = vec![];

    for (locality, result) in join_all(lookups).await {
        let venues = match result {
            Ok(Ok(venues)) => venues,
            Ok(Err(e)) => {
                log::warn!("Error searching venues in {}: {e}", locality.name);
                failures.push(LookupFailure::from_error(&locality.name, &e));
                vec![]
            }
            Err(_) => {
                log::warn!(
                    "Venue search in {} timed out after {:?}",
                    locality.name,
                    options.lookup_timeout
                );
                failures.push(LookupFailure {
                    locality: locality.name.clone(),
                    kind: FailureKind::TimedOut,
                    message: format!("timed out after {:?}", options.lookup_timeout),
                });
                vec![]
            }
        };
        raw_groups.push(VenueSearchResult {
            location: locality.name.clone(),
            venues,
        });
    }

    let groups = cap_venues(tag_localities(raw_groups.clone()), options.max_total_venues);

    log::info!(
        "Kept {} venue(s) in {} group(s), {} lookup failure(s)",
        surfaced_venue_models::total_venues(&groups),
        groups.len(),
        failures.len()
    );

    Aggregation {
        groups,
        raw_groups,
        failures,
    }
}

/// Sets every venue's `locality` to its group's name, overwriting any
/// previous value.
#[must_use]
pub fn tag_localities(mut groups: Vec<VenueSearchResult>) -> Vec<VenueSearchResult> {
    for group in &mut groups {
        for venue in &mut group.venues {
            venue.locality = Some(group.location.clone());
        }
    }
    groups
}

/// Keeps the first `max_total` venues walking groups then venues in order,
/// and drops groups left empty.
#[must_use]
pub fn cap_venues(groups: Vec<VenueSearchResult>, max_total: usize) -> Vec<VenueSearchResult> {
    let mut remaining = max_total;

    groups
        .into_iter()
        .filter_map(|mut group| {
            let keep = group.venues.len().min(remaining);
            group.venues.truncate(keep);
            remaining -= keep;
            (!group.venues.is_empty()).then_some(group)
        })
        .collect()
}

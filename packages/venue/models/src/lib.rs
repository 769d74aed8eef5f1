#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Venue and locality types for natural-language venue search.
//!
//! A search asks an AI collaborator for a handful of [`LocalitySuggestion`]s,
//! looks up [`Venue`]s around each one, and groups the results into
//! [`VenueSearchResult`]s. None of these values outlive a single search.

use serde::{Deserialize, Serialize};
use surfaced_report_models::{ColorToken, Location};

/// Maximum number of localities a single suggestion may carry.
pub const MAX_SUGGESTED_LOCALITIES: usize = 3;

/// Whether a venue is open right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    pub open_now: bool,
}

/// A point-of-interest business returned by a places lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    /// Provider place ID.
    pub id: String,
    pub name: String,
    /// Average rating, 0-5.
    pub rating: f64,
    pub user_ratings_total: u32,
    /// Price level, 1-4.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<u8>,
    pub coordinates: Location,
    pub address: String,
    /// Provider category tags (`bar`, `restaurant`, ...).
    #[serde(default)]
    pub types: Vec<String>,
    pub business_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<OpeningHours>,
    /// Name of the locality group this venue was found in. Assigned during
    /// aggregation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
}

impl Venue {
    /// Returns the display string for this venue's price level.
    #[must_use]
    pub fn price_text(&self) -> &'static str {
        price_text(self.price_level)
    }

    /// Returns the display color for this venue's category tags.
    #[must_use]
    pub fn type_color(&self) -> ColorToken {
        venue_type_color(&self.types)
    }

    /// Ranking score used to order lookup results: rating weighted by the
    /// log of the review count.
    #[must_use]
    pub fn popularity_score(&self) -> f64 {
        self.rating * f64::from(self.user_ratings_total).ln_1p()
    }
}

/// Venues found around one locality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueSearchResult {
    /// Locality name.
    pub location: String,
    pub venues: Vec<Venue>,
}

/// Counts venues across all groups.
#[must_use]
pub fn total_venues(groups: &[VenueSearchResult]) -> usize {
    groups.iter().map(|group| group.venues.len()).sum()
}

/// A locality proposed by the AI collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalitySuggestion {
    pub name: String,
    pub coordinates: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rough area kind (`nightlife`, `tech`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Short witty label tied to the user's query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
}

/// The AI collaborator's answer to a natural-language location query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalitySuggestions {
    /// At most [`MAX_SUGGESTED_LOCALITIES`] localities, most relevant first.
    pub locations: Vec<LocalitySuggestion>,
    /// Kind of query (`party_hubs`, `restaurants`, ...).
    pub query_type: String,
    /// Venue keywords used to drive the places lookup.
    #[serde(default)]
    pub search_terms: Vec<String>,
}

impl LocalitySuggestions {
    /// Finds a suggested locality by name, ignoring case.
    #[must_use]
    pub fn find_locality(&self, name: &str) -> Option<&LocalitySuggestion> {
        self.locations
            .iter()
            .find(|locality| locality.name.eq_ignore_ascii_case(name))
    }
}

/// Returns the display string for a price level.
#[must_use]
pub const fn price_text(price_level: Option<u8>) -> &'static str {
    match price_level {
        Some(1) => "$",
        Some(2) => "$$",
        Some(3) => "$$$",
        Some(4) => "$$$$",
        _ => "Price not available",
    }
}

/// Picks a display color from a venue's category tags.
///
/// Nightclubs win over bars, bars over restaurants, restaurants over cafes.
#[must_use]
pub fn venue_type_color(types: &[String]) -> ColorToken {
    const PRECEDENCE: &[(&str, ColorToken)] = &[
        ("night_club", ColorToken::Purple),
        ("bar", ColorToken::Blue),
        ("restaurant", ColorToken::Green),
        ("cafe", ColorToken::Orange),
    ];

    PRECEDENCE
        .iter()
        .find(|(tag, _)| types.iter().any(|t| t == *tag))
        .map_or(ColorToken::Gray, |(_, color)| *color)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn price_text_covers_levels_and_fallback() {
        assert_eq!(price_text(Some(1)), "$");
        assert_eq!(price_text(Some(2)), "$$");
        assert_eq!(price_text(Some(3)), "$$$");
        assert_eq!(price_text(Some(4)), "$$$$");
        assert_eq!(price_text(Some(0)), "Price not available");
        assert_eq!(price_text(Some(5)), "Price not available");
        assert_eq!(price_text(None), "Price not available");
    }

    #[test]
    fn venue_type_color_precedence() {
        assert_eq!(venue_type_color(&tags(&["bar", "night_club"])), ColorToken::Purple);
        assert_eq!(venue_type_color(&tags(&["restaurant", "bar"])), ColorToken::Blue);
        assert_eq!(venue_type_color(&tags(&["cafe", "restaurant"])), ColorToken::Green);
        assert_eq!(venue_type_color(&tags(&["cafe"])), ColorToken::Orange);
        assert_eq!(venue_type_color(&tags(&["gym"])), ColorToken::Gray);
        assert_eq!(venue_type_color(&[]), ColorToken::Gray);
    }

    #[test]
    fn suggestions_parse_with_optional_fields_missing() {
        let suggestions: LocalitySuggestions = serde_json::from_value(serde_json::json!({
            "locations": [{
                "name": "Koramangala",
                "coordinates": { "latitude": 12.9352, "longitude": 77.6245 }
            }],
            "query_type": "party_hubs",
            "search_terms": ["pubs"]
        }))
        .unwrap();

        assert_eq!(suggestions.locations.len(), 1);
        assert!(suggestions.locations[0].tagline.is_none());
        assert!(suggestions.find_locality("koramangala").is_some());
        assert!(suggestions.find_locality("Indiranagar").is_none());
    }

    #[test]
    fn popularity_weights_reviews_logarithmically() {
        let venue = |rating: f64, total: u32| Venue {
            id: String::new(),
            name: String::new(),
            rating,
            user_ratings_total: total,
            price_level: None,
            coordinates: Location::new(0.0, 0.0),
            address: String::new(),
            types: vec![],
            business_status: "OPERATIONAL".to_string(),
            photo_reference: None,
            opening_hours: None,
            locality: None,
        };

        assert!(venue(4.0, 2000).popularity_score() > venue(4.8, 10).popularity_score());
        assert!(venue(5.0, 0).popularity_score().abs() < f64::EPSILON);
    }
}

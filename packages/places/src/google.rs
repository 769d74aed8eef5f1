//! Google Places Nearby Search provider.
//!
//! Two search strategies are tried in order: a keyword search over all
//! establishments, then a plain search for bars. The first strategy that
//! yields relevant venues wins. Quota and permission failures stop the
//! lookup immediately; any other non-`OK` status moves on to the next
//! strategy.
//!
//! Address lookups go through the Geocoding API and keep only the first
//! result.
//!
//! See <https://developers.google.com/maps/documentation/places/web-service/search-nearby>
//! and <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>

use std::time::Duration;

use serde::Deserialize;
use surfaced_report_models::Location;
use surfaced_venue_models::{OpeningHours, Venue};

use crate::{GeocodedPlace, PlaceGeocoder, PlacesError, VenueLookup};

const NEARBY_SEARCH_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";
const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const PHOTO_URL: &str = "https://maps.googleapis.com/maps/api/place/photo";

/// Place types worth showing on the venues map.
const RELEVANT_TYPES: &[&str] = &[
    "bar",
    "night_club",
    "restaurant",
    "cafe",
    "meal_takeaway",
    "food",
    "establishment",
    "point_of_interest",
];

/// Google Places API provider.
pub struct GooglePlacesProvider {
    api_key: String,
    client: reqwest::Client,
}

impl GooglePlacesProvider {
    /// Creates a new provider.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: String) -> Result<Self, PlacesError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { api_key, client })
    }

    /// Builds a photo URL for a venue's `photo_reference`.
    #[must_use]
    pub fn photo_url(&self, photo_reference: &str, max_width: u32) -> String {
        photo_url(&self.api_key, photo_reference, max_width)
    }

    async fn nearby_search(
        &self,
        strategy: SearchStrategy,
        center: Location,
        search_terms: &[String],
        radius_meters: u32,
    ) -> Result<NearbyResponse, PlacesError> {
        let mut params = vec![
            (
                "location",
                format!("{},{}", center.latitude, center.longitude),
            ),
            ("radius", radius_meters.to_string()),
            ("key", self.api_key.clone()),
        ];
        params.extend(strategy.params(search_terms));

        let resp = self
            .client
            .get(NEARBY_SEARCH_URL)
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PlacesError::Status {
                status: status.to_string(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        Ok(resp.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: String,
    geometry: Geometry,
}

fn interpret_geocode(response: GeocodeResponse) -> Result<Option<GeocodedPlace>, PlacesError> {
    let GeocodeResponse {
        status,
        results,
        error_message,
    } = response;

    match status.as_str() {
        "OK" => Ok(results.into_iter().next().map(|result| GeocodedPlace {
            formatted_address: result.formatted_address,
            coordinates: Location::new(result.geometry.location.lat, result.geometry.location.lng),
        })),
        "ZERO_RESULTS" => Ok(None),
        "OVER_QUERY_LIMIT" => Err(PlacesError::QuotaExceeded),
        "REQUEST_DENIED" => Err(PlacesError::RequestDenied {
            message: error_message.unwrap_or_default(),
        }),
        other => Err(PlacesError::Status {
            status: other.to_string(),
            message: error_message.unwrap_or_default(),
        }),
    }
}

#[async_trait::async_trait]
impl PlaceGeocoder for GooglePlacesProvider {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedPlace>, PlacesError> {
        log::debug!("Geocoding '{address}'");

        let resp = self
            .client
            .get(GEOCODE_URL)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PlacesError::Status {
                status: status.to_string(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        interpret_geocode(resp.json().await?)
    }
}

/// Builds a Places photo URL.
#[must_use]
pub fn photo_url(api_key: &str, photo_reference: &str, max_width: u32) -> String {
    format!("{PHOTO_URL}?maxwidth={max_width}&photo_reference={photo_reference}&key={api_key}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchStrategy {
    /// All establishments matching the search terms.
    Keyword,
    /// Any bar, ignoring the search terms.
    Bars,
}

impl SearchStrategy {
    const ALL: [Self; 2] = [Self::Keyword, Self::Bars];

    fn params(self, search_terms: &[String]) -> Vec<(&'static str, String)> {
        match self {
            Self::Keyword => vec![
                ("keyword", search_terms.join(" ")),
                ("type", "establishment".to_string()),
            ],
            Self::Bars => vec![("type", "bar".to_string())],
        }
    }
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    #[serde(default)]
    place_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    user_ratings_total: Option<u32>,
    #[serde(default)]
    price_level: Option<u8>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    vicinity: Option<String>,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    business_status: Option<String>,
    #[serde(default)]
    photos: Vec<Photo>,
    #[serde(default)]
    opening_hours: Option<PlaceOpeningHours>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Photo {
    photo_reference: String,
}

#[derive(Debug, Deserialize)]
struct PlaceOpeningHours {
    #[serde(default)]
    open_now: Option<bool>,
}

impl PlaceResult {
    fn is_relevant(&self) -> bool {
        self.types
            .iter()
            .any(|t| RELEVANT_TYPES.contains(&t.as_str()))
    }

    fn into_venue(self) -> Venue {
        Venue {
            id: self.place_id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            rating: self.rating.unwrap_or(0.0),
            user_ratings_total: self.user_ratings_total.unwrap_or(0),
            price_level: self.price_level,
            coordinates: self.geometry.map_or(Location::new(0.0, 0.0), |g| {
                Location::new(g.location.lat, g.location.lng)
            }),
            address: self.vicinity.unwrap_or_default(),
            types: self.types,
            business_status: self
                .business_status
                .unwrap_or_else(|| "OPERATIONAL".to_string()),
            photo_reference: self.photos.into_iter().next().map(|p| p.photo_reference),
            opening_hours: self.opening_hours.map(|h| OpeningHours {
                open_now: h.open_now.unwrap_or(false),
            }),
            locality: None,
        }
    }
}

/// What to do after one strategy's response.
#[derive(Debug)]
enum StrategyOutcome {
    Found(Vec<Venue>),
    TryNext,
}

/// Keeps relevant places, truncates to `limit`, then orders by popularity.
fn select_venues(results: Vec<PlaceResult>, limit: usize) -> Vec<Venue> {
    let mut venues: Vec<Venue> = results
        .into_iter()
        .filter(PlaceResult::is_relevant)
        .take(limit)
        .map(PlaceResult::into_venue)
        .collect();

    venues.sort_by(|a, b| b.popularity_score().total_cmp(&a.popularity_score()));
    venues
}

fn interpret(response: NearbyResponse, limit: usize) -> Result<StrategyOutcome, PlacesError> {
    let NearbyResponse {
        status,
        results,
        error_message,
    } = response;
    let message = || error_message.clone().unwrap_or_default();

    match status.as_str() {
        "OK" => {
            let venues = select_venues(results, limit);
            if venues.is_empty() {
                log::debug!("No relevant venues in this strategy's results");
                Ok(StrategyOutcome::TryNext)
            } else {
                Ok(StrategyOutcome::Found(venues))
            }
        }
        "ZERO_RESULTS" => Ok(StrategyOutcome::TryNext),
        "OVER_QUERY_LIMIT" => Err(PlacesError::QuotaExceeded),
        "REQUEST_DENIED" => Err(PlacesError::RequestDenied { message: message() }),
        other => {
            log::warn!("Places search returned {other}: {}", message());
            Ok(StrategyOutcome::TryNext)
        }
    }
}

#[async_trait::async_trait]
impl VenueLookup for GooglePlacesProvider {
    async fn lookup_venues(
        &self,
        center: Location,
        search_terms: &[String],
        radius_meters: u32,
        limit: usize,
    ) -> Result<Vec<Venue>, PlacesError> {
        for strategy in SearchStrategy::ALL {
            log::debug!(
                "Searching venues near {},{} with {strategy:?} strategy (terms: {})",
                center.latitude,
                center.longitude,
                search_terms.join(", ")
            );

            let response = self
                .nearby_search(strategy, center, search_terms, radius_meters)
                .await?;

            if let StrategyOutcome::Found(venues) = interpret(response, limit)? {
                log::debug!("Found {} venue(s) with {strategy:?} strategy", venues.len());
                return Ok(venues);
            }
        }

        log::debug!("All search strategies exhausted, no venues found");
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(value: serde_json::Value) -> NearbyResponse {
        serde_json::from_value(value).unwrap()
    }

    fn place(name: &str, types: &[&str], rating: f64, total: u32) -> serde_json::Value {
        json!({
            "place_id": format!("id-{name}"),
            "name": name,
            "rating": rating,
            "user_ratings_total": total,
            "geometry": { "location": { "lat": 12.93, "lng": 77.62 } },
            "vicinity": "80 Feet Road, Koramangala",
            "types": types,
        })
    }

    #[test]
    fn status_codes_map_to_outcomes() {
        assert!(matches!(
            interpret(response(json!({ "status": "OVER_QUERY_LIMIT" })), 4),
            Err(PlacesError::QuotaExceeded)
        ));
        assert!(matches!(
            interpret(
                response(json!({ "status": "REQUEST_DENIED", "error_message": "bad key" })),
                4
            ),
            Err(PlacesError::RequestDenied { message }) if message == "bad key"
        ));
        assert!(matches!(
            interpret(response(json!({ "status": "ZERO_RESULTS", "results": [] })), 4),
            Ok(StrategyOutcome::TryNext)
        ));
        assert!(matches!(
            interpret(response(json!({ "status": "INVALID_REQUEST" })), 4),
            Ok(StrategyOutcome::TryNext)
        ));
    }

    #[test]
    fn irrelevant_results_fall_through_to_next_strategy() {
        let outcome = interpret(
            response(json!({
                "status": "OK",
                "results": [place("Gym", &["gym", "health"], 4.5, 100)],
            })),
            4,
        )
        .unwrap();
        assert!(matches!(outcome, StrategyOutcome::TryNext));
    }

    #[test]
    fn truncates_before_sorting_by_popularity() {
        let results = response(json!({
            "status": "OK",
            "results": [
                place("Quiet Cafe", &["cafe"], 4.9, 3),
                place("Gym", &["gym"], 5.0, 9000),
                place("Toit", &["bar", "restaurant"], 4.5, 20000),
                place("Late Entry", &["night_club"], 5.0, 50000),
            ],
        }))
        .results;

        let venues = select_venues(results, 2);
        let names: Vec<&str> = venues.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["Toit", "Quiet Cafe"]);
    }

    #[test]
    fn converts_place_fields() {
        let mut raw = place("Toit", &["bar"], 4.5, 20000);
        raw["price_level"] = json!(3);
        raw["photos"] = json!([{ "photo_reference": "ph-1", "width": 400 }]);
        raw["opening_hours"] = json!({});
        raw["business_status"] = json!("CLOSED_TEMPORARILY");

        let venue = select_venues(response(json!({ "status": "OK", "results": [raw] })).results, 4)
            .remove(0);

        assert_eq!(venue.id, "id-Toit");
        assert_eq!(venue.price_text(), "$$$");
        assert_eq!(venue.photo_reference.as_deref(), Some("ph-1"));
        assert_eq!(venue.opening_hours, Some(OpeningHours { open_now: false }));
        assert_eq!(venue.business_status, "CLOSED_TEMPORARILY");
        assert_eq!(venue.coordinates, Location::new(12.93, 77.62));
        assert!(venue.locality.is_none());
    }

    #[test]
    fn geocoding_keeps_the_first_match() {
        let response: GeocodeResponse = serde_json::from_value(json!({
            "status": "OK",
            "results": [
                {
                    "formatted_address": "Whitefield, Bengaluru, Karnataka, India",
                    "geometry": { "location": { "lat": 12.9698, "lng": 77.75 } },
                },
                {
                    "formatted_address": "Whitefield Road, Bengaluru",
                    "geometry": { "location": { "lat": 12.99, "lng": 77.71 } },
                },
            ],
        }))
        .unwrap();

        let place = interpret_geocode(response).unwrap().unwrap();
        assert_eq!(place.formatted_address, "Whitefield, Bengaluru, Karnataka, India");
        assert_eq!(place.coordinates, Location::new(12.9698, 77.75));
    }

    #[test]
    fn geocoding_statuses_map_to_outcomes() {
        let geocode = |value| interpret_geocode(serde_json::from_value(value).unwrap());

        assert!(matches!(
            geocode(json!({ "status": "ZERO_RESULTS", "results": [] })),
            Ok(None)
        ));
        assert!(matches!(
            geocode(json!({ "status": "OVER_QUERY_LIMIT" })),
            Err(PlacesError::QuotaExceeded)
        ));
        assert!(matches!(
            geocode(json!({ "status": "REQUEST_DENIED", "error_message": "no key" })),
            Err(PlacesError::RequestDenied { message }) if message == "no key"
        ));
        assert!(matches!(
            geocode(json!({ "status": "INVALID_REQUEST" })),
            Err(PlacesError::Status { status, .. }) if status == "INVALID_REQUEST"
        ));
    }

    #[test]
    fn missing_fields_get_neutral_defaults() {
        let venue = select_venues(
            response(json!({ "status": "OK", "results": [{ "types": ["cafe"] }] })).results,
            4,
        )
        .remove(0);

        assert_eq!(venue.name, "");
        assert!(venue.rating.abs() < f64::EPSILON);
        assert_eq!(venue.business_status, "OPERATIONAL");
        assert!(venue.opening_hours.is_none());
    }

    #[test]
    fn strategies_build_expected_params() {
        let terms = vec!["pubs".to_string(), "bars".to_string()];
        assert_eq!(
            SearchStrategy::Keyword.params(&terms),
            vec![
                ("keyword", "pubs bars".to_string()),
                ("type", "establishment".to_string())
            ]
        );
        assert_eq!(
            SearchStrategy::Bars.params(&terms),
            vec![("type", "bar".to_string())]
        );
    }

    #[test]
    fn photo_urls_carry_reference_and_key() {
        assert_eq!(
            photo_url("k", "ph-1", 400),
            "https://maps.googleapis.com/maps/api/place/photo?maxwidth=400&photo_reference=ph-1&key=k"
        );
    }
}

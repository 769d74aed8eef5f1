#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard state and map marker rendering.
//!
//! [`Dashboard`] owns the live report collection, the latest venue search
//! results, the view selection, and the map focus. What
//! belongs on the map is decided by [`render`], a pure function of a
//! [`DashboardView`] snapshot; drawing the markers is left to the caller.

pub mod marker;

use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use surfaced_report::UrbanReport;
use surfaced_report::store::ReportStore;
use surfaced_search::{MapFocus, PlaceOutcome, SearchOutcome, VENUE_FOCUS_ZOOM};
use surfaced_venue_models::{LocalitySuggestions, VenueSearchResult};

pub use marker::{Marker, MarkerSet, render};

/// Which layer the map shows.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActiveTab {
    /// Urban report markers.
    #[default]
    Events,
    /// Venue search results.
    Venues,
}

#[derive(Debug, Default)]
struct ViewState {
    venues: Arc<Vec<VenueSearchResult>>,
    suggestions: Option<Arc<LocalitySuggestions>>,
    active_tab: ActiveTab,
    selected_locality: Option<String>,
    focus: Option<MapFocus>,
}

/// A consistent snapshot of everything the map depends on.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub reports: Arc<Vec<UrbanReport>>,
    pub venues: Arc<Vec<VenueSearchResult>>,
    /// Suggestions behind `venues`, used for locality taglines.
    pub suggestions: Option<Arc<LocalitySuggestions>>,
    pub active_tab: ActiveTab,
    pub selected_locality: Option<String>,
    /// Where the map was last asked to move.
    pub focus: Option<MapFocus>,
}

/// Shared dashboard state.
///
/// Venue results and the selection pointing into them live under one lock,
/// so a view never pairs a selected locality with another search's venues.
#[derive(Debug)]
pub struct Dashboard {
    reports: ReportStore,
    state: RwLock<ViewState>,
}

impl Dashboard {
    /// Creates a dashboard showing `reports` on the events tab.
    #[must_use]
    pub fn new(reports: Vec<UrbanReport>) -> Self {
        Self {
            reports: ReportStore::new(reports),
            state: RwLock::new(ViewState::default()),
        }
    }

    /// The live report collection.
    #[must_use]
    pub const fn reports(&self) -> &ReportStore {
        &self.reports
    }

    /// Replaces the report collection with a fresh snapshot.
    pub fn replace_reports(&self, reports: Vec<UrbanReport>) {
        log::debug!("Replacing {} report(s) with {}", self.reports.len(), reports.len());
        self.reports.replace(reports);
    }

    /// Adds a single pushed report, replacing any report with the same id.
    pub fn push_report(&self, report: UrbanReport) {
        self.reports.update(|reports| {
            match reports.iter_mut().find(|existing| existing.id == report.id) {
                Some(existing) => *existing = report,
                None => reports.push(report),
            }
        });
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ViewState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shows a search's venues: switches to the venues tab, clears any
    /// selected locality, and moves to the search's focus.
    pub fn apply_search(&self, outcome: &SearchOutcome) {
        let venues = Arc::new(outcome.groups.clone());
        let suggestions = Arc::new(outcome.suggestions.clone());

        let mut state = self.write_state();
        state.venues = venues;
        state.suggestions = Some(suggestions);
        state.active_tab = ActiveTab::Venues;
        state.selected_locality = None;
        state.focus = Some(outcome.focus);
    }

    /// Moves the map to a geocoded place. The tab and results are kept.
    pub fn apply_place(&self, place: &PlaceOutcome) {
        self.write_state().focus = Some(place.focus);
    }

    /// Switches tabs.
    pub fn set_active_tab(&self, tab: ActiveTab) {
        self.write_state().active_tab = tab;
    }

    /// Drills into one locality's venues. Returns where the map should move
    /// (the locality's first venue), or `None` if no group has that name.
    pub fn select_locality(&self, name: &str) -> Option<MapFocus> {
        let mut state = self.write_state();
        let group = state.venues.iter().find(|group| group.location == name)?;
        let location = group.location.clone();
        let focus = group.venues.first().map(|venue| MapFocus {
            center: venue.coordinates,
            zoom: VENUE_FOCUS_ZOOM,
        });

        state.selected_locality = Some(location);
        if focus.is_some() {
            state.focus = focus;
        }
        focus
    }

    /// Returns to the overview of all localities.
    pub fn clear_selected_locality(&self) {
        self.write_state().selected_locality = None;
    }

    /// Takes a consistent snapshot for rendering.
    #[must_use]
    pub fn view(&self) -> DashboardView {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        DashboardView {
            reports: self.reports.snapshot(),
            venues: Arc::clone(&state.venues),
            suggestions: state.suggestions.clone(),
            active_tab: state.active_tab,
            selected_locality: state.selected_locality.clone(),
            focus: state.focus,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use surfaced_report::seed::demo_reports;
    use surfaced_places::GeocodedPlace;
    use surfaced_report_models::Location;
    use surfaced_search::{LOCALITY_FOCUS_ZOOM, PLACE_FOCUS_ZOOM};
    use surfaced_venue_models::{LocalitySuggestion, Venue};

    use super::*;

    pub fn venue(name: &str, latitude: f64) -> Venue {
        Venue {
            id: format!("id-{name}"),
            name: name.to_string(),
            rating: 4.4,
            user_ratings_total: 800,
            price_level: Some(2),
            coordinates: Location::new(latitude, 77.62),
            address: String::new(),
            types: vec!["bar".to_string()],
            business_status: "OPERATIONAL".to_string(),
            photo_reference: None,
            opening_hours: None,
            locality: None,
        }
    }

    pub fn outcome() -> SearchOutcome {
        let locality = |name: &str, latitude: f64, tagline: Option<&str>| LocalitySuggestion {
            name: name.to_string(),
            coordinates: Location::new(latitude, 77.62),
            description: None,
            category: Some("nightlife".to_string()),
            tagline: tagline.map(ToString::to_string),
        };

        SearchOutcome {
            suggestions: LocalitySuggestions {
                locations: vec![
                    locality("Koramangala", 12.93, Some("Drunkard's Paradise")),
                    locality("Indiranagar", 12.97, None),
                ],
                query_type: "party_hubs".to_string(),
                search_terms: vec!["pubs".to_string()],
            },
            groups: vec![
                VenueSearchResult {
                    location: "Koramangala".to_string(),
                    venues: vec![venue("Toit", 12.931), venue("Socials", 12.932)],
                },
                VenueSearchResult {
                    location: "Indiranagar".to_string(),
                    venues: vec![venue("Arbor", 12.971)],
                },
            ],
            failures: vec![],
            total_found: 3,
            focus: MapFocus {
                center: Location::new(12.931, 77.62),
                zoom: LOCALITY_FOCUS_ZOOM,
            },
        }
    }

    #[test]
    fn search_switches_to_venues_and_resets_selection() {
        let dashboard = Dashboard::new(demo_reports(chrono::Utc::now()));
        dashboard.apply_search(&outcome());
        dashboard.select_locality("Koramangala");

        dashboard.apply_search(&outcome());
        let view = dashboard.view();

        assert_eq!(view.active_tab, ActiveTab::Venues);
        assert!(view.selected_locality.is_none());
        assert_eq!(view.venues.len(), 2);
        assert_eq!(view.reports.len(), 5);
    }

    #[test]
    fn selecting_a_locality_focuses_its_first_venue() {
        let dashboard = Dashboard::new(vec![]);
        dashboard.apply_search(&outcome());

        assert_eq!(
            dashboard.select_locality("Indiranagar"),
            Some(MapFocus {
                center: Location::new(12.971, 77.62),
                zoom: VENUE_FOCUS_ZOOM
            })
        );
        assert_eq!(
            dashboard.view().selected_locality.as_deref(),
            Some("Indiranagar")
        );

        assert_eq!(dashboard.select_locality("Whitefield"), None);
        assert_eq!(
            dashboard.view().selected_locality.as_deref(),
            Some("Indiranagar")
        );

        dashboard.clear_selected_locality();
        assert!(dashboard.view().selected_locality.is_none());
    }

    #[test]
    fn views_are_stable_snapshots() {
        let dashboard = Dashboard::new(demo_reports(chrono::Utc::now()));
        let before = dashboard.view();

        dashboard.replace_reports(vec![]);
        dashboard.set_active_tab(ActiveTab::Venues);

        assert_eq!(before.reports.len(), 5);
        assert_eq!(before.active_tab, ActiveTab::Events);
        assert!(dashboard.reports().is_empty());
    }

    #[test]
    fn tab_names_parse() {
        assert_eq!("venues".parse::<ActiveTab>().unwrap(), ActiveTab::Venues);
        assert_eq!(ActiveTab::Events.to_string(), "events");
    }

    #[test]
    fn pushed_reports_append_or_replace_by_id() {
        let reports = demo_reports(chrono::Utc::now());
        let dashboard = Dashboard::new(reports[..2].to_vec());

        let mut updated = reports[0].clone();
        updated.holistic_summary.title = "Traffic cleared - MG Road".to_string();
        dashboard.push_report(updated);
        dashboard.push_report(reports[2].clone());

        let view = dashboard.view();
        let titles: Vec<&str> = view
            .reports
            .iter()
            .map(|r| r.holistic_summary.title.as_str())
            .collect();
        assert_eq!(
            titles,
            [
                "Traffic cleared - MG Road",
                "Bengaluru Literature Festival",
                "Road Closure - Whitefield Road"
            ]
        );
    }

    #[test]
    fn place_lookups_move_the_map_without_touching_results() {
        let dashboard = Dashboard::new(vec![]);
        dashboard.apply_search(&outcome());
        assert_eq!(
            dashboard.view().focus.map(|f| f.zoom),
            Some(LOCALITY_FOCUS_ZOOM)
        );

        let focus = MapFocus {
            center: Location::new(12.9698, 77.75),
            zoom: PLACE_FOCUS_ZOOM,
        };
        dashboard.apply_place(&PlaceOutcome {
            query: "Whitefield".to_string(),
            place: GeocodedPlace {
                formatted_address: "Whitefield, Bengaluru".to_string(),
                coordinates: focus.center,
            },
            focus,
        });

        let view = dashboard.view();
        assert_eq!(view.focus, Some(focus));
        assert_eq!(view.active_tab, ActiveTab::Venues);
        assert_eq!(view.venues.len(), 2);
    }

    #[test]
    fn selection_never_points_at_replaced_venues() {
        let dashboard = Dashboard::new(vec![]);
        let mut other = outcome();
        other.groups = vec![VenueSearchResult {
            location: "Whitefield".to_string(),
            venues: vec![venue("Windmills", 12.98)],
        }];

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..500 {
                    let next = if i % 2 == 0 { outcome() } else { other.clone() };
                    let first = next.groups[0].location.clone();
                    dashboard.apply_search(&next);
                    dashboard.select_locality(&first);
                }
            });

            for _ in 0..2 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        let view = dashboard.view();
                        assert!(view.selected_locality.as_ref().is_none_or(|name| {
                            view.venues.iter().any(|group| &group.location == name)
                        }));
                    }
                });
            }
        });
    }
}

//! Map markers derived from a [`DashboardView`].

use serde::Serialize;
use surfaced_report_models::{ColorToken, Location};

use crate::{ActiveTab, DashboardView};

/// Label shown over a locality with no tagline from the suggester.
pub const DEFAULT_TAGLINE: &str = "Hidden Gem";

/// Colors assigned to locality groups by position, cycling.
pub const LOCALITY_PALETTE: [ColorToken; 3] =
    [ColorToken::Purple, ColorToken::Blue, ColorToken::Green];

/// One thing to draw on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Marker {
    /// An urban report at its primary location.
    Report {
        report_id: String,
        position: Location,
        color: ColorToken,
        title: String,
    },
    /// A locality group, placed at its first venue.
    Locality {
        name: String,
        position: Location,
        color: ColorToken,
        venue_count: usize,
        tagline: String,
    },
    /// A single venue of the selected locality.
    Venue {
        venue_id: String,
        name: String,
        position: Location,
        color: ColorToken,
        locality: String,
    },
}

/// Everything to draw, in drawing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkerSet {
    pub markers: Vec<Marker>,
}

impl MarkerSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

fn locality_color(index: usize) -> ColorToken {
    LOCALITY_PALETTE[index % LOCALITY_PALETTE.len()]
}

/// Decides what the map shows.
///
/// * Events tab: one marker per report at its first summary location,
///   tinted by priority.
/// * Venues tab, nothing selected: one marker per non-empty locality group
///   at its first venue, with the venue count and the matching suggestion's
///   tagline.
/// * Venues tab, locality selected: that locality's venues only.
#[must_use]
pub fn render(view: &DashboardView) -> MarkerSet {
    let markers = match view.active_tab {
        ActiveTab::Events => view
            .reports
            .iter()
            .filter_map(|report| {
                let summary = &report.holistic_summary;
                summary.primary_location().map(|location| Marker::Report {
                    report_id: report.id.clone(),
                    position: *location,
                    color: summary.report_priority.color(),
                    title: summary.title.clone(),
                })
            })
            .collect(),
        ActiveTab::Venues => match &view.selected_locality {
            None => locality_markers(view),
            Some(selected) => venue_markers(view, selected),
        },
    };

    MarkerSet { markers }
}

fn locality_markers(view: &DashboardView) -> Vec<Marker> {
    view.venues
        .iter()
        .enumerate()
        .filter_map(|(index, group)| {
            let center = group.venues.first()?;
            let tagline = view
                .suggestions
                .as_ref()
                .and_then(|s| s.find_locality(&group.location))
                .and_then(|locality| locality.tagline.clone())
                .unwrap_or_else(|| DEFAULT_TAGLINE.to_string());

            Some(Marker::Locality {
                name: group.location.clone(),
                position: center.coordinates,
                color: locality_color(index),
                venue_count: group.venues.len(),
                tagline,
            })
        })
        .collect()
}

fn venue_markers(view: &DashboardView, selected: &str) -> Vec<Marker> {
    view.venues
        .iter()
        .enumerate()
        .filter(|(_, group)| group.location == selected)
        .flat_map(|(index, group)| {
            group.venues.iter().map(move |venue| Marker::Venue {
                venue_id: venue.id.clone(),
                name: venue.name.clone(),
                position: venue.coordinates,
                color: locality_color(index),
                locality: venue
                    .locality
                    .clone()
                    .unwrap_or_else(|| group.location.clone()),
            })
        })
        .collect()
}

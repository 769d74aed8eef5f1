//! Selection of reports from the active collection.
//!
//! Every function here borrows its input, never reorders it, and returns
//! references to the matching reports in their original order.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surfaced_report_models::{Location, Priority, SourceType, UrbanReport};

/// A geographic bounding box in WGS84 coordinates.
///
/// Boxes crossing the antimeridian (`west > east`) are not supported: the
/// longitude test is a plain inclusive comparison, so such a box matches
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl GeoBounds {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Whether `location` lies inside the box, edges included.
    #[must_use]
    pub fn contains(&self, location: &Location) -> bool {
        (self.south..=self.north).contains(&location.latitude)
            && (self.west..=self.east).contains(&location.longitude)
    }
}

impl FromStr for GeoBounds {
    type Err = String;

    /// Parses `"west,south,east,north"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Invalid bounding box '{s}': {e}"))?;

        match parts.as_slice() {
            [west, south, east, north] => Ok(Self::new(*west, *south, *east, *north)),
            _ => Err(format!(
                "Invalid bounding box '{s}': expected west,south,east,north"
            )),
        }
    }
}

/// Reports whose summary priority is one of `priorities`.
#[must_use]
pub fn filter_by_priority<'a>(
    reports: &'a [UrbanReport],
    priorities: &[Priority],
) -> Vec<&'a UrbanReport> {
    reports
        .iter()
        .filter(|r| matches_priority(r, priorities))
        .collect()
}

/// Reports whose submitter type is one of `source_types`.
#[must_use]
pub fn filter_by_source_type<'a>(
    reports: &'a [UrbanReport],
    source_types: &[SourceType],
) -> Vec<&'a UrbanReport> {
    reports
        .iter()
        .filter(|r| matches_source_type(r, source_types))
        .collect()
}

/// Reports tagged with at least one of `topics`. Each report appears once
/// no matter how many of its topics match.
#[must_use]
pub fn filter_by_topics<'a, S: AsRef<str>>(
    reports: &'a [UrbanReport],
    topics: &[S],
) -> Vec<&'a UrbanReport> {
    reports
        .iter()
        .filter(|r| matches_topics(r, topics))
        .collect()
}

/// Reports with at least one summary location inside `bounds`.
#[must_use]
pub fn filter_by_geographical_bounds<'a>(
    reports: &'a [UrbanReport],
    bounds: &GeoBounds,
) -> Vec<&'a UrbanReport> {
    reports
        .iter()
        .filter(|r| matches_bounds(r, bounds))
        .collect()
}

/// Reports whose summary *starts* within `[start, end]`.
///
/// Only the start timestamp is checked, so an event that began before
/// `start` is excluded even if it is still ongoing.
#[must_use]
pub fn filter_by_time_range<'a>(
    reports: &'a [UrbanReport],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<&'a UrbanReport> {
    reports
        .iter()
        .filter(|r| matches_time_range(r, Some(start), Some(end)))
        .collect()
}

fn matches_priority(report: &UrbanReport, priorities: &[Priority]) -> bool {
    priorities.contains(&report.holistic_summary.report_priority)
}

fn matches_source_type(report: &UrbanReport, source_types: &[SourceType]) -> bool {
    source_types.contains(&report.report_metadata.source_type)
}

fn matches_topics<S: AsRef<str>>(report: &UrbanReport, topics: &[S]) -> bool {
    report
        .holistic_summary
        .topics
        .iter()
        .any(|topic| topics.iter().any(|wanted| wanted.as_ref() == topic))
}

fn matches_bounds(report: &UrbanReport, bounds: &GeoBounds) -> bool {
    report
        .holistic_summary
        .locations
        .iter()
        .any(|location| bounds.contains(location))
}

fn matches_time_range(
    report: &UrbanReport,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> bool {
    let started = report.holistic_summary.start_timestamp;
    from.is_none_or(|from| started >= from) && to.is_none_or(|to| started <= to)
}

/// A combined report query. Every criterion that is set must match; unset
/// criteria match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportQuery {
    /// Allowed summary priorities.
    pub priorities: Vec<Priority>,
    /// Allowed submitter types.
    pub source_types: Vec<SourceType>,
    /// Topics, any of which admits a report.
    pub topics: Vec<String>,
    /// Spatial bounding box filter.
    pub bbox: Option<GeoBounds>,
    /// Earliest summary start time.
    pub from: Option<DateTime<Utc>>,
    /// Latest summary start time.
    pub to: Option<DateTime<Utc>>,
}

impl ReportQuery {
    /// Whether `report` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, report: &UrbanReport) -> bool {
        (self.priorities.is_empty() || matches_priority(report, &self.priorities))
            && (self.source_types.is_empty() || matches_source_type(report, &self.source_types))
            && (self.topics.is_empty() || matches_topics(report, &self.topics))
            && self.bbox.is_none_or(|bbox| matches_bounds(report, &bbox))
            && matches_time_range(report, self.from, self.to)
    }

    /// Applies the query, preserving input order.
    #[must_use]
    pub fn apply<'a>(&self, reports: &'a [UrbanReport]) -> Vec<&'a UrbanReport> {
        reports.iter().filter(|r| self.matches(r)).collect()
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Urban report data model and classification helpers.
//!
//! An [`UrbanReport`] is the aggregate root: one raw [`IngestRequest`] plus
//! the metadata derived from it and a [`HolisticSummary`] meant for display.
//! Field names follow the wire schema of the reporting backend
//! (`snake_case`), so these types serialize directly into the format the
//! backend and the realtime database exchange.

pub mod taxonomy;
pub mod timestamp;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use taxonomy::{TopicCategory, all_topics, topic_category};

/// A WGS84 coordinate pair.
///
/// Ranges are not enforced; out-of-range values pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Location {
    /// Creates a new location.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Reads an optional string, treating an empty string as absent.
fn non_empty_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let text: Option<String> = Option::deserialize(deserializer)?;
    Ok(text.filter(|t| !t.is_empty()))
}

/// Semantic color tokens used to tint markers and badges.
///
/// The presentation layer decides how to draw each token; [`Self::css_class`]
/// gives the utility class the web dashboard uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColorToken {
    Red,
    Orange,
    Green,
    Blue,
    Purple,
    /// Neutral fallback for unmapped values.
    Gray,
}

impl ColorToken {
    /// Returns the dashboard's background utility class for this token.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Red => "bg-red-500",
            Self::Orange => "bg-orange-500",
            Self::Green => "bg-green-500",
            Self::Blue => "bg-blue-500",
            Self::Purple => "bg-purple-500",
            Self::Gray => "bg-gray-500",
        }
    }
}

/// Who submitted a report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// A business announcing something about itself.
    Business,
    /// A civic authority (police, utilities, transit operators).
    Authority,
    /// An individual member of the public.
    User,
    Other,
}

impl SourceType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Business, Self::Authority, Self::User, Self::Other]
    }
}

/// Temporal classification of the reported event.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    PastEvent,
    CurrentEvent,
    FutureEvent,
}

impl ReportType {
    /// Returns the display color for this report type.
    #[must_use]
    pub const fn color(self) -> ColorToken {
        match self {
            Self::CurrentEvent => ColorToken::Blue,
            Self::FutureEvent => ColorToken::Purple,
            Self::PastEvent => ColorToken::Gray,
        }
    }
}

/// Urgency assigned to a report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    /// Not applicable / not assessed.
    #[serde(rename = "NA")]
    #[strum(to_string = "NA")]
    Na,
}

impl Priority {
    /// Returns the display color for this priority. Unassessed priorities
    /// get the neutral token.
    #[must_use]
    pub const fn color(self) -> ColorToken {
        match self {
            Self::High => ColorToken::Red,
            Self::Medium => ColorToken::Orange,
            Self::Low => ColorToken::Green,
            Self::Na => ColorToken::Gray,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::Na]
    }
}

/// Outcome of the backend's verification pass.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Rejected,
    Verified,
}

/// The original raw submission behind a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Unique request ID.
    pub id: String,
    /// Who submitted it.
    pub source_type: SourceType,
    /// Identifier of the submitter within its source type.
    pub source_id: String,
    /// Free-text body, if any.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty_text"
    )]
    pub text: Option<String>,
    /// Where the submitter was when reporting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_from_location: Option<Location>,
    /// When the submission was made.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub reported_at_timestamp: Option<DateTime<Utc>>,
}

/// Metadata extracted from an attached file (photo, video, document).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_id: String,
    /// MIME-ish type label assigned by the backend.
    pub file_type: String,
    /// Capture time embedded in the file.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    /// Capture location embedded in the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty_text"
    )]
    pub location_name: Option<String>,
    pub file_description: String,
}

/// A date/time reference found in report text: either a single instant
/// or an explicit start/end range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatetimeMention {
    Instant(DateTime<Utc>),
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Metadata extracted from the submission's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMetadata {
    pub text: String,
    pub original_language: String,
    /// English, cleaned-up restatement of the text.
    pub normalized_description: String,
    #[serde(default)]
    pub location_names: Vec<String>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub datetime_mentions: Vec<DatetimeMention>,
}

/// Classification of a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub source_type: SourceType,
    pub report_type: ReportType,
    pub report_priority: Priority,
    /// Tags drawn from the [`taxonomy`].
    #[serde(default)]
    pub report_topics: Vec<String>,
    #[serde(with = "timestamp")]
    pub reported_at_timestamp: DateTime<Utc>,
    pub reported_from_location: Location,
}

/// Score and rationale of one verification check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckMetadata {
    /// Score from 0 to 5.
    pub score: u8,
    pub reason: String,
}

/// Result of the backend's verification of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMetadata {
    pub status: VerificationStatus,
    pub reason: String,
    /// Product of the three check scores (0-125).
    pub validity_scores: u8,
    pub triviality_check_metadata: CheckMetadata,
    pub location_datetime_check_metadata: CheckMetadata,
    pub coherence_check_metadata: CheckMetadata,
}

/// Human-facing synthesis of one or more underlying requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolisticSummary {
    pub id: String,
    pub title: String,
    pub details: String,
    /// Must be non-empty for the report to enter the active collection.
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Names aligned with `locations`; lengths may differ.
    #[serde(default)]
    pub location_names: Vec<String>,
    /// File reference IDs.
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub report_type: ReportType,
    pub report_priority: Priority,
    #[serde(with = "timestamp")]
    pub start_timestamp: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub end_timestamp: DateTime<Utc>,
}

impl HolisticSummary {
    /// The location used to place this summary on a map.
    #[must_use]
    pub fn primary_location(&self) -> Option<&Location> {
        self.locations.first()
    }

    /// Whether the summary ends before it starts.
    ///
    /// Such summaries are accepted as-is; this is exposed so callers can
    /// flag them.
    #[must_use]
    pub fn has_inverted_time_range(&self) -> bool {
        self.end_timestamp < self.start_timestamp
    }
}

/// A classified, summarized account of a real-world event tied to one or
/// more locations.
///
/// Reports are never edited in place: a fresher snapshot replaces the whole
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrbanReport {
    pub id: String,
    pub request: IngestRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_metadata: Option<FileMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_metadata: Option<TextMetadata>,
    pub report_metadata: ReportMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_metadata: Option<VerificationMetadata>,
    pub holistic_summary: HolisticSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_colors_fall_back_to_neutral() {
        assert_eq!(Priority::High.color(), ColorToken::Red);
        assert_eq!(Priority::Medium.color(), ColorToken::Orange);
        assert_eq!(Priority::Low.color(), ColorToken::Green);
        assert_eq!(Priority::Na.color(), ColorToken::Gray);
        assert_eq!(Priority::Na.color().css_class(), "bg-gray-500");
    }

    #[test]
    fn report_type_colors() {
        assert_eq!(ReportType::CurrentEvent.color().css_class(), "bg-blue-500");
        assert_eq!(ReportType::FutureEvent.color().css_class(), "bg-purple-500");
        assert_eq!(ReportType::PastEvent.color().css_class(), "bg-gray-500");
    }

    #[test]
    fn enums_use_backend_spelling() {
        assert_eq!(Priority::Na.to_string(), "NA");
        assert_eq!("NA".parse::<Priority>().unwrap(), Priority::Na);
        assert_eq!(ReportType::CurrentEvent.as_ref(), "CURRENT_EVENT");
        assert_eq!(
            serde_json::to_value(SourceType::Authority).unwrap(),
            serde_json::json!("AUTHORITY")
        );
        assert_eq!(
            serde_json::from_value::<Priority>(serde_json::json!("NA")).unwrap(),
            Priority::Na
        );
    }

    #[test]
    fn inverted_time_range_is_detected() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let summary = HolisticSummary {
            id: "s".to_string(),
            title: "t".to_string(),
            details: "d".to_string(),
            locations: vec![Location::new(12.9, 77.6)],
            location_names: vec![],
            files: vec![],
            topics: vec![],
            report_type: ReportType::CurrentEvent,
            report_priority: Priority::Low,
            start_timestamp: start,
            end_timestamp: start - chrono::Duration::hours(1),
        };

        assert!(summary.has_inverted_time_range());
        assert_eq!(summary.primary_location(), Some(&Location::new(12.9, 77.6)));
    }
}

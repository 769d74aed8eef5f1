//! Validation and conversion of raw report records.
//!
//! This is the only place untyped JSON turns into [`UrbanReport`]s. The
//! contract is two-step: [`is_valid_urban_report_data`] gates a record, and
//! [`convert_python_urban_report`] rebuilds it field by field, converting
//! every timestamp. Conversion does not re-check the gate; a record that
//! skipped it fails with an error naming the missing field rather than
//! getting defaults filled in.

use serde::Deserialize as _;
use serde_json::Value;
use surfaced_report_models::UrbanReport;
use thiserror::Error;

/// Errors produced while normalizing raw records.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A record is missing a required field or has a malformed one.
    #[error("Failed to convert report {id}: {source}")]
    Conversion {
        /// The record's `id`, or `<unknown>` if it has none.
        id: String,
        /// What serde rejected.
        source: serde_json::Error,
    },

    /// A snapshot was neither an array nor a keyed object of records.
    #[error("Unsupported snapshot shape: expected array or object, got {kind}")]
    SnapshotShape {
        /// JSON type of the snapshot.
        kind: &'static str,
    },
}

/// Checks that a record has the structure required to become a report.
///
/// Requires a string `id`, non-null `request`, `report_metadata`, and
/// `holistic_summary`, and a non-empty `holistic_summary.locations` array.
/// Everything else is left for conversion to judge.
#[must_use]
pub fn is_valid_urban_report_data(record: &Value) -> bool {
    let present = |field: &str| record.get(field).is_some_and(|v| !v.is_null());

    record.get("id").is_some_and(Value::is_string)
        && present("request")
        && present("report_metadata")
        && present("holistic_summary")
        && record
            .pointer("/holistic_summary/locations")
            .and_then(Value::as_array)
            .is_some_and(|locations| !locations.is_empty())
}

/// Rebuilds a typed report from a record that passed
/// [`is_valid_urban_report_data`].
///
/// Timestamps in `request`, `file_metadata`, `text_metadata` (each datetime
/// mention, single or start/end pair), `report_metadata`, and
/// `holistic_summary` are converted from their wire form. Optional
/// sub-objects are only built when present and non-null.
///
/// # Errors
///
/// Returns [`NormalizeError::Conversion`] if a required field is missing
/// or any field is malformed.
pub fn convert_python_urban_report(record: &Value) -> Result<UrbanReport, NormalizeError> {
    let report = UrbanReport::deserialize(record).map_err(|source| NormalizeError::Conversion {
        id: record_id(record),
        source,
    })?;

    if report.holistic_summary.has_inverted_time_range() {
        log::debug!(
            "Report {} ends before it starts ({} > {})",
            report.id,
            report.holistic_summary.start_timestamp,
            report.holistic_summary.end_timestamp
        );
    }

    Ok(report)
}

/// Converts every record in order. Does not filter: run
/// [`is_valid_urban_report_data`] first.
///
/// # Errors
///
/// Returns the first record's [`NormalizeError`] that fails to convert.
pub fn convert_python_urban_reports_array(
    records: &[Value],
) -> Result<Vec<UrbanReport>, NormalizeError> {
    records.iter().map(convert_python_urban_report).collect()
}

/// Serializes a report back into the backend's wire format, with every
/// timestamp written as an RFC 3339 UTC string.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn convert_to_api_format(report: &UrbanReport) -> Result<Value, serde_json::Error> {
    serde_json::to_value(report)
}

/// Validates and converts a batch of records, dropping (and logging) the
/// ones that don't make it.
#[must_use]
pub fn normalize_records<I>(records: I) -> Vec<UrbanReport>
where
    I: IntoIterator<Item = Value>,
{
    let mut rejected = 0_usize;

    let reports: Vec<UrbanReport> = records
        .into_iter()
        .filter_map(|record| {
            if !is_valid_urban_report_data(&record) {
                rejected += 1;
                log::debug!("Rejected invalid report record {}", record_id(&record));
                return None;
            }
            match convert_python_urban_report(&record) {
                Ok(report) => Some(report),
                Err(e) => {
                    rejected += 1;
                    log::warn!("{e}");
                    None
                }
            }
        })
        .collect();

    if rejected > 0 {
        log::warn!(
            "Dropped {rejected} invalid report record(s), kept {}",
            reports.len()
        );
    }

    reports
}

/// Normalizes a full snapshot of records.
///
/// Accepts either an array of records or an object keyed by report ID (the
/// realtime database shape). For keyed objects the key becomes the record's
/// `id` unless the record already carries one. `null` yields no reports.
///
/// # Errors
///
/// Returns [`NormalizeError::SnapshotShape`] for any other JSON type.
pub fn normalize_snapshot(snapshot: Value) -> Result<Vec<UrbanReport>, NormalizeError> {
    match snapshot {
        Value::Null => Ok(vec![]),
        Value::Array(records) => Ok(normalize_records(records)),
        Value::Object(entries) => Ok(normalize_records(entries.into_iter().map(
            |(key, mut record)| {
                if let Value::Object(fields) = &mut record {
                    fields.entry("id").or_insert(Value::String(key));
                }
                record
            },
        ))),
        other => Err(NormalizeError::SnapshotShape {
            kind: json_kind(&other),
        }),
    }
}

fn record_id(record: &Value) -> String {
    record
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<unknown>")
        .to_string()
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

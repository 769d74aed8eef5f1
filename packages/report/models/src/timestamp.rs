//! Conversion between wire timestamps and [`DateTime<Utc>`].
//!
//! The reporting backend is not consistent about how it writes times.
//! Accepted inputs:
//!
//! * RFC 3339 strings (`2024-05-01T10:00:00Z`, `2024-05-01T15:30:00+05:30`)
//! * ISO datetimes without an offset (`2024-05-01T10:00:00.123456`), read
//!   as UTC
//! * bare dates (`2024-05-01`), read as midnight UTC
//! * numbers, read as milliseconds since the Unix epoch
//!
//! Output is always RFC 3339 in UTC with a `Z` suffix, keeping sub-second
//! precision so values survive a round trip unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeTuple, Serializer};

use crate::DatetimeMention;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a textual timestamp in any of the accepted forms.
///
/// # Errors
///
/// Returns a description of the input if none of the forms match.
pub fn parse(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }

    Err(format!("unrecognized timestamp '{text}'"))
}

/// Converts epoch milliseconds into a timestamp.
///
/// # Errors
///
/// Returns a description if the value is outside chrono's range.
pub fn from_millis(millis: i64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| format!("timestamp {millis}ms is out of range"))
}

/// Formats a timestamp the way the backend expects to receive it.
#[must_use]
pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Float(f64),
    Text(String),
}

impl RawTimestamp {
    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn resolve(self) -> Result<DateTime<Utc>, String> {
        match self {
            Self::Millis(millis) => from_millis(millis),
            Self::Float(millis) => from_millis(millis as i64),
            Self::Text(text) => parse(&text),
        }
    }
}

/// A timestamp deserialized from any accepted wire form.
struct WireTimestamp(DateTime<Utc>);

impl<'de> Deserialize<'de> for WireTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawTimestamp::deserialize(deserializer)?
            .resolve()
            .map(Self)
            .map_err(de::Error::custom)
    }
}

/// Serializes a required timestamp field.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(value))
}

/// Deserializes a required timestamp field.
///
/// # Errors
///
/// Fails if the value is missing, null, or not a recognizable timestamp.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    WireTimestamp::deserialize(deserializer).map(|ts| ts.0)
}

/// Serde helpers for optional timestamp fields. `null` and empty strings
/// read as `None`.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::de::{Deserialize as _, Deserializer, Error as _};
    use serde::ser::Serializer;

    use super::RawTimestamp;

    /// Serializes an optional timestamp field.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => super::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional timestamp field.
    ///
    /// # Errors
    ///
    /// Fails if a non-blank value is present but not a recognizable
    /// timestamp.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<RawTimestamp>::deserialize(deserializer)? {
            Some(raw) if !raw.is_blank() => raw.resolve().map(Some).map_err(D::Error::custom),
            _ => Ok(None),
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawMention {
    Range(Vec<WireTimestamp>),
    Instant(WireTimestamp),
}

impl Serialize for DatetimeMention {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Instant(at) => serializer.serialize_str(&format(at)),
            Self::Range { start, end } => {
                let mut pair = serializer.serialize_tuple(2)?;
                pair.serialize_element(&format(start))?;
                pair.serialize_element(&format(end))?;
                pair.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for DatetimeMention {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawMention::deserialize(deserializer)? {
            RawMention::Instant(at) => Ok(Self::Instant(at.0)),
            // Only the first two elements of a range are meaningful.
            RawMention::Range(stamps) => {
                let len = stamps.len();
                let mut stamps = stamps.into_iter();
                match (stamps.next(), stamps.next()) {
                    (Some(start), Some(end)) => Ok(Self::Range {
                        start: start.0,
                        end: end.0,
                    }),
                    _ => Err(de::Error::invalid_length(len, &"at least two timestamps")),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn parses_all_accepted_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        assert_eq!(parse("2024-05-01T10:00:00Z").unwrap(), expected);
        assert_eq!(parse("2024-05-01T15:30:00+05:30").unwrap(), expected);
        assert_eq!(parse("2024-05-01T10:00:00").unwrap(), expected);
        assert_eq!(parse("2024-05-01 10:00:00").unwrap(), expected);
        assert_eq!(
            parse("2024-05-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
        assert!(parse("yesterday-ish").is_err());
    }

    #[test]
    fn keeps_sub_second_precision() {
        let parsed = parse("2024-05-01T10:00:00.123456").unwrap();
        assert_eq!(format(&parsed), "2024-05-01T10:00:00.123456Z");
        assert_eq!(parse(&format(&parsed)).unwrap(), parsed);
    }

    #[test]
    fn mentions_distinguish_instants_from_ranges() {
        let instant: DatetimeMention =
            serde_json::from_value(serde_json::json!("2024-05-01T10:00:00Z")).unwrap();
        assert!(matches!(instant, DatetimeMention::Instant(_)));

        let range: DatetimeMention = serde_json::from_value(serde_json::json!([
            "2024-05-01T10:00:00Z",
            "2024-05-01T12:00:00Z"
        ]))
        .unwrap();
        let DatetimeMention::Range { start, end } = range else {
            panic!("expected a range, got {range:?}");
        };
        assert_eq!(end - start, chrono::Duration::hours(2));

        assert_eq!(
            serde_json::to_value(range).unwrap(),
            serde_json::json!(["2024-05-01T10:00:00Z", "2024-05-01T12:00:00Z"])
        );
    }

    #[test]
    fn ranges_use_their_first_two_elements() {
        let range: DatetimeMention = serde_json::from_value(serde_json::json!([
            "2024-05-01T10:00:00Z",
            "2024-05-01T12:00:00Z",
            "2024-05-02T09:00:00Z"
        ]))
        .unwrap();
        assert_eq!(
            range,
            DatetimeMention::Range {
                start: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            }
        );

        assert!(
            serde_json::from_value::<DatetimeMention>(serde_json::json!(["2024-05-01T10:00:00Z"]))
                .is_err()
        );
    }

    #[test]
    fn numbers_are_epoch_millis() {
        let mention: DatetimeMention =
            serde_json::from_value(serde_json::json!(1_714_557_600_000_i64)).unwrap();
        assert_eq!(
            mention,
            DatetimeMention::Instant(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
    }
}

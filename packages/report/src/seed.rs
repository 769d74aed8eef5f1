//! Built-in demo reports for Bengaluru, shown until a live snapshot
//! arrives.

use chrono::{DateTime, Duration, Utc};
use surfaced_report_models::{
    HolisticSummary, IngestRequest, Location, Priority, ReportMetadata, ReportType, SourceType,
    UrbanReport,
};

/// Center of Bengaluru.
pub const BENGALURU_CENTER: Location = Location::new(12.9716, 77.5946);

struct DemoReport {
    id: &'static str,
    source_type: SourceType,
    source_id: &'static str,
    text: &'static str,
    location: Location,
    priority: Priority,
    topics: &'static [&'static str],
    title: &'static str,
    details: &'static str,
    location_names: &'static [&'static str],
    started_minutes_ago: i64,
    ends_in_minutes: i64,
}

const DEMO_REPORTS: &[DemoReport] = &[
    DemoReport {
        id: "1",
        source_type: SourceType::Authority,
        source_id: "traffic_dept_blr",
        text: "Heavy traffic reported on MG Road due to construction work",
        location: Location::new(12.9716, 77.5946),
        priority: Priority::High,
        topics: &["traffic", "infrastructure"],
        title: "Heavy Traffic - MG Road",
        details: "Traffic jam on MG Road due to ongoing construction work. Expect delays of 15-20 minutes.",
        location_names: &["MG Road", "Brigade Road Junction"],
        started_minutes_ago: 5,
        ends_in_minutes: 60,
    },
    DemoReport {
        id: "2",
        source_type: SourceType::Business,
        source_id: "palace_grounds_events",
        text: "Bengaluru Literature Festival ongoing at Palace Grounds",
        location: Location::new(12.9352, 77.6245),
        priority: Priority::Medium,
        topics: &["event", "gathering", "entertainment"],
        title: "Bengaluru Literature Festival",
        details: "Annual literature festival featuring renowned authors, book readings, and cultural performances.",
        location_names: &["Palace Grounds"],
        started_minutes_ago: 30,
        ends_in_minutes: 120,
    },
    DemoReport {
        id: "3",
        source_type: SourceType::Authority,
        source_id: "bbmp_works",
        text: "Temporary road closure on Whitefield Road for emergency repairs",
        location: Location::new(12.9579, 77.6411),
        priority: Priority::Medium,
        topics: &["safety", "infrastructure", "road_closure"],
        title: "Road Closure - Whitefield Road",
        details: "Temporary road closure on Whitefield Road for emergency water pipe repairs. Alternative routes available.",
        location_names: &["Whitefield Road", "ITPL Main Road"],
        started_minutes_ago: 60,
        ends_in_minutes: 180,
    },
    DemoReport {
        id: "4",
        source_type: SourceType::Authority,
        source_id: "bmrcl_ops",
        text: "Purple line metro experiencing delays due to technical issues",
        location: Location::new(12.9780, 77.5909),
        priority: Priority::Medium,
        topics: &["metro", "transport"],
        title: "Metro Delay - Purple Line",
        details: "Purple line experiencing 10-minute delays due to technical issues at Cubbon Park station.",
        location_names: &["Cubbon Park Metro Station", "Purple Line"],
        started_minutes_ago: 15,
        ends_in_minutes: 30,
    },
    DemoReport {
        id: "5",
        source_type: SourceType::Authority,
        source_id: "bescom_ops",
        text: "Scheduled power maintenance in HSR Layout area",
        location: Location::new(12.9266, 77.6277),
        priority: Priority::Low,
        topics: &["power", "maintenance"],
        title: "Power Maintenance - HSR Layout",
        details: "Scheduled maintenance affecting HSR Layout area. Power will be restored by 6 PM.",
        location_names: &["HSR Layout", "Sector 1", "Sector 2"],
        started_minutes_ago: 45,
        ends_in_minutes: 90,
    },
];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

impl DemoReport {
    fn build(&self, now: DateTime<Utc>) -> UrbanReport {
        let started = now - Duration::minutes(self.started_minutes_ago);

        UrbanReport {
            id: self.id.to_string(),
            request: IngestRequest {
                id: self.id.to_string(),
                source_type: self.source_type,
                source_id: self.source_id.to_string(),
                text: Some(self.text.to_string()),
                reported_from_location: Some(self.location),
                reported_at_timestamp: Some(started),
            },
            file_metadata: None,
            text_metadata: None,
            report_metadata: ReportMetadata {
                source_type: self.source_type,
                report_type: ReportType::CurrentEvent,
                report_priority: self.priority,
                report_topics: strings(self.topics),
                reported_at_timestamp: started,
                reported_from_location: self.location,
            },
            verification_metadata: None,
            holistic_summary: HolisticSummary {
                id: self.id.to_string(),
                title: self.title.to_string(),
                details: self.details.to_string(),
                locations: vec![self.location],
                location_names: strings(self.location_names),
                files: vec![],
                topics: strings(self.topics),
                report_type: ReportType::CurrentEvent,
                report_priority: self.priority,
                start_timestamp: started,
                end_timestamp: now + Duration::minutes(self.ends_in_minutes),
            },
        }
    }
}

/// Returns the five demo reports with times relative to `now`.
#[must_use]
pub fn demo_reports(now: DateTime<Utc>) -> Vec<UrbanReport> {
    DEMO_REPORTS.iter().map(|demo| demo.build(now)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{convert_to_api_format, is_valid_urban_report_data};

    #[test]
    fn demo_reports_are_current_and_valid() {
        let now = Utc::now();
        let reports = demo_reports(now);

        assert_eq!(reports.len(), 5);
        for report in &reports {
            let summary = &report.holistic_summary;
            assert!(summary.start_timestamp <= now && now <= summary.end_timestamp);
            assert!(!summary.has_inverted_time_range());
            assert!(is_valid_urban_report_data(
                &convert_to_api_format(report).unwrap()
            ));
        }
    }

    #[test]
    fn only_the_mg_road_report_is_high_priority() {
        let reports = demo_reports(Utc::now());
        let high: Vec<&str> = reports
            .iter()
            .filter(|r| r.holistic_summary.report_priority == Priority::High)
            .map(|r| r.holistic_summary.title.as_str())
            .collect();
        assert_eq!(high, ["Heavy Traffic - MG Road"]);
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for Surfaced.
//!
//! Loads and filters urban reports, runs venue searches and place lookups,
//! and follows the live report feed.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use surfaced_ai::create_suggester_from_env;
use surfaced_ai::gemini::GeminiProvider;
use surfaced_dashboard::{Dashboard, render};
use surfaced_places::{DEFAULT_RADIUS_METERS, create_geocoder_from_env, create_lookup_from_env};
use surfaced_report::UrbanReport;
use surfaced_report::api::UrbanReportClient;
use surfaced_report::feed::{DEFAULT_POLL_INTERVAL, FirebaseFeed, ReportFeed, subscribe};
use surfaced_report::filter::{GeoBounds, ReportQuery};
use surfaced_report::normalize::{convert_to_api_format, normalize_snapshot};
use surfaced_report::seed::demo_reports;
use surfaced_report_models::{Priority, SourceType, TopicCategory, timestamp};
use surfaced_search::{AggregateOptions, QueryOutcome, run_query};

#[derive(Parser)]
#[command(name = "surfaced", about = "Urban reports and venue search for Bengaluru")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load urban reports, filter them, and print them in API format
    Reports {
        /// Read a JSON snapshot (array or keyed object) instead of calling the backend
        #[arg(long, conflicts_with = "demo")]
        file: Option<PathBuf>,
        /// Use the built-in demo reports
        #[arg(long)]
        demo: bool,
        /// Comma-separated priorities (e.g., "high,medium")
        #[arg(long, value_delimiter = ',')]
        priority: Vec<String>,
        /// Comma-separated source types (e.g., "user,authority")
        #[arg(long, value_delimiter = ',')]
        source_type: Vec<String>,
        /// Comma-separated topics; a report matches if it has any of them
        #[arg(long, value_delimiter = ',')]
        topics: Vec<String>,
        /// Bounding box as "west,south,east,north"
        #[arg(long, allow_hyphen_values = true)]
        bbox: Option<GeoBounds>,
        /// Only reports starting at or after this timestamp
        #[arg(long)]
        from: Option<String>,
        /// Only reports starting at or before this timestamp
        #[arg(long)]
        to: Option<String>,
        /// Print map markers instead of reports
        #[arg(long)]
        markers: bool,
    },
    /// Search for venues, or jump to a place when given a bare place name
    Search {
        /// What to look for (e.g., "where to party in Bengaluru" or "Whitefield")
        query: String,
        /// Drill into one suggested locality
        #[arg(long)]
        select: Option<String>,
        /// Search radius around each locality, in meters
        #[arg(long, default_value_t = DEFAULT_RADIUS_METERS)]
        radius: u32,
    },
    /// Ask a general question about Bengaluru
    Ask {
        question: String,
    },
    /// Follow the live report feed until interrupted
    Watch {
        /// Poll interval in seconds
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
        interval: u64,
        /// Load reports from the backend and follow its WebSocket channel
        /// instead of polling the realtime database
        #[arg(long)]
        websocket: bool,
    },
    /// List the topic taxonomy
    Topics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Reports {
            file,
            demo,
            priority,
            source_type,
            topics,
            bbox,
            from,
            to,
            markers,
        } => {
            let query = ReportQuery {
                priorities: parse_each::<Priority>(&priority)?,
                source_types: parse_each::<SourceType>(&source_type)?,
                topics,
                bbox,
                from: from.as_deref().map(parse_time).transpose()?,
                to: to.as_deref().map(parse_time).transpose()?,
            };

            let reports = load_reports(file.as_deref(), demo).await?;
            let matched: Vec<UrbanReport> = query.apply(&reports).into_iter().cloned().collect();
            log::info!("{} of {} report(s) matched", matched.len(), reports.len());

            if markers {
                let dashboard = Dashboard::new(matched);
                println!("{}", serde_json::to_string_pretty(&render(&dashboard.view()))?);
            } else {
                let api = matched
                    .iter()
                    .map(convert_to_api_format)
                    .collect::<Result<Vec<_>, _>>()?;
                println!("{}", serde_json::to_string_pretty(&api)?);
            }
        }
        Commands::Search {
            query,
            select,
            radius,
        } => {
            let suggester = create_suggester_from_env()?;
            let lookup = create_lookup_from_env()?;
            let geocoder = create_geocoder_from_env()?;
            let options = AggregateOptions {
                radius_meters: radius,
                ..AggregateOptions::default()
            };

            let outcome = run_query(
                suggester.as_ref(),
                lookup.as_ref(),
                geocoder.as_ref(),
                &query,
                &options,
            )
            .await?;

            let dashboard = Dashboard::new(vec![]);
            match &outcome {
                QueryOutcome::Place(place) => {
                    log::info!("Found {}", place.place.formatted_address);
                    dashboard.apply_place(place);
                }
                QueryOutcome::Venues(venues) => {
                    for failure in &venues.failures {
                        log::warn!(
                            "Lookup failed for {} ({:?}): {}",
                            failure.locality,
                            failure.kind,
                            failure.message
                        );
                    }
                    dashboard.apply_search(venues);

                    if let Some(name) = select
                        && dashboard.select_locality(&name).is_none()
                    {
                        log::warn!("No venues found in '{name}'");
                    }
                }
            }

            let view = dashboard.view();
            let output = serde_json::json!({
                "outcome": outcome,
                "focus": view.focus,
                "markers": render(&view),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Ask { question } => {
            let provider = GeminiProvider::from_env()?;
            println!("{}", provider.answer_general_query(&question).await?);
        }
        Commands::Watch {
            interval,
            websocket,
        } => {
            let dashboard = Arc::new(Dashboard::new(vec![]));
            let sink = Arc::clone(&dashboard);

            let subscription = if websocket {
                let client = UrbanReportClient::from_env()?;
                dashboard.replace_reports(client.get_all_reports().await?);
                log::info!("Loaded {} report(s)", dashboard.reports().len());

                client.connect_websocket(move |report| {
                    log::info!("New report: {}", report.holistic_summary.title);
                    sink.push_report(report);
                })
            } else {
                let feed: Arc<dyn ReportFeed> = Arc::new(FirebaseFeed::from_env()?);
                subscribe(feed, Duration::from_secs(interval), move |reports| {
                    sink.replace_reports(reports);
                    let markers = render(&sink.view());
                    log::info!(
                        "Received {} report(s), {} marker(s) on the map",
                        sink.reports().len(),
                        markers.len()
                    );
                })
            };

            log::info!("Watching for report updates, press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            subscription.unsubscribe().await;
            log::info!("Stopped with {} report(s) loaded", dashboard.reports().len());
        }
        Commands::Topics => {
            for category in TopicCategory::all() {
                println!("{category}");
                for topic in category.topics() {
                    println!("  {topic}");
                }
            }
        }
    }

    Ok(())
}

async fn load_reports(
    file: Option<&Path>,
    demo: bool,
) -> Result<Vec<UrbanReport>, Box<dyn std::error::Error>> {
    if demo {
        return Ok(demo_reports(Utc::now()));
    }

    if let Some(path) = file {
        log::info!("Loading reports from {}", path.display());
        let text = tokio::fs::read_to_string(path).await?;
        return Ok(normalize_snapshot(serde_json::from_str(&text)?)?);
    }

    let client = UrbanReportClient::from_env()?;
    Ok(client.get_all_reports().await?)
}

/// Parses `SCREAMING_SNAKE_CASE` enum values, accepting any case.
fn parse_each<T>(values: &[String]) -> Result<Vec<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    values
        .iter()
        .map(|value| {
            value
                .trim()
                .to_ascii_uppercase()
                .parse()
                .map_err(|e| format!("Invalid value '{value}': {e}"))
        })
        .collect()
}

fn parse_time(text: &str) -> Result<DateTime<Utc>, String> {
    timestamp::parse(text).map_err(|e| format!("Invalid timestamp '{text}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_flags_accept_any_case() {
        let priorities =
            parse_each::<Priority>(&["high".to_string(), " Na ".to_string()]).unwrap();
        assert_eq!(priorities, [Priority::High, Priority::Na]);

        let sources = parse_each::<SourceType>(&["user".to_string(), "AUTHORITY".to_string()])
            .unwrap();
        assert_eq!(sources, [SourceType::User, SourceType::Authority]);
    }

    #[test]
    fn unknown_enum_flags_name_the_value() {
        let err = parse_each::<SourceType>(&["user_report".to_string()]).unwrap_err();
        assert!(err.contains("user_report"), "{err}");
    }

    #[test]
    fn cli_parses_report_filters() {
        let cli = Cli::try_parse_from([
            "surfaced",
            "reports",
            "--demo",
            "--priority",
            "high,medium",
            "--bbox",
            "-77.6,12.9,77.7,13.0",
        ])
        .unwrap();

        let Commands::Reports {
            demo,
            priority,
            bbox,
            ..
        } = cli.command
        else {
            panic!("expected the reports command");
        };
        assert!(demo);
        assert_eq!(priority, ["high", "medium"]);
        assert!(bbox.is_some_and(|b| (b.west + 77.6).abs() < f64::EPSILON));
    }
}

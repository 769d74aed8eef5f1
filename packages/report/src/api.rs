//! Client for the reporting backend's REST API and live report channel.
//!
//! Every list endpoint returns a JSON array of raw records. Records that
//! fail [`is_valid_urban_report_data`] are dropped before conversion; a
//! non-array body is treated as an empty list.
//!
//! New reports are also pushed one at a time over a WebSocket at
//! [`WEBSOCKET_PATH`]. Each message goes through the same validity gate.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt as _;
use serde::Deserialize;
use serde_json::Value;
use surfaced_report_models::timestamp;
use tokio_tungstenite::tungstenite::Message;

use crate::feed::Subscription;
use crate::normalize::{
    convert_python_urban_report, convert_to_api_format, is_valid_urban_report_data,
    normalize_records,
};
use crate::{ReportError, UrbanReport};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default search radius for [`UrbanReportClient::get_reports_by_location`].
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// Path of the live report channel, relative to the base URL.
pub const WEBSOCKET_PATH: &str = "/ws/urban-reports";

/// Backend acknowledgement of a submitted report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmitResponse {
    /// ID assigned by the backend, if it returned one.
    #[serde(default)]
    pub id: Option<String>,
}

/// HTTP client for `/api/urban-reports`.
#[derive(Debug, Clone)]
pub struct UrbanReportClient {
    client: reqwest::Client,
    base_url: String,
}

impl UrbanReportClient {
    /// Creates a client for the backend at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Creates a client from `SURFACED_API_BASE_URL`, defaulting to
    /// [`DEFAULT_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Http`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, ReportError> {
        let base_url = std::env::var("SURFACED_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::new(client, base_url))
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/api/urban-reports{suffix}", self.base_url)
    }

    fn report_url(&self, id: &str) -> Result<reqwest::Url, ReportError> {
        let mut url = reqwest::Url::parse(&self.endpoint("")).map_err(|e| ReportError::Config {
            message: format!("Invalid backend URL {}: {e}", self.base_url),
        })?;
        url.path_segments_mut()
            .map_err(|()| ReportError::Config {
                message: format!("Backend URL {} cannot take a path", self.base_url),
            })?
            .push(id);
        Ok(url)
    }

    /// URL of the live report channel: the base URL with its `http` scheme
    /// swapped for `ws` (`https` becomes `wss`).
    #[must_use]
    pub fn websocket_url(&self) -> String {
        let base = self
            .base_url
            .strip_prefix("http")
            .map_or_else(|| self.base_url.clone(), |rest| format!("ws{rest}"));
        format!("{base}{WEBSOCKET_PATH}")
    }

    /// Streams reports pushed over the live report channel to `on_report`,
    /// one at a time. Invalid messages are logged and skipped. The stream
    /// ends when the server closes the connection or it fails; there is no
    /// reconnect. Must be called from within a tokio runtime.
    pub fn connect_websocket<F>(&self, on_report: F) -> Subscription
    where
        F: FnMut(UrbanReport) + Send + 'static,
    {
        subscribe_websocket(self.websocket_url(), on_report)
    }

    /// Fetches every report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] on transport failure or a non-success status.
    pub async fn get_all_reports(&self) -> Result<Vec<UrbanReport>, ReportError> {
        self.get_list("", &[]).await
    }

    /// Fetches reports within `radius_km` of a point.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] on transport failure or a non-success status.
    pub async fn get_reports_by_location(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<UrbanReport>, ReportError> {
        self.get_list(
            "/location",
            &[
                ("lat", latitude.to_string()),
                ("lng", longitude.to_string()),
                ("radius", radius_km.to_string()),
            ],
        )
        .await
    }

    /// Fetches reports tagged with any of `topics`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] on transport failure or a non-success status.
    pub async fn get_reports_by_topics<S: AsRef<str>>(
        &self,
        topics: &[S],
    ) -> Result<Vec<UrbanReport>, ReportError> {
        let joined = topics
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");
        self.get_list("/topics", &[("topics", joined)]).await
    }

    /// Fetches reports within a time range.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] on transport failure or a non-success status.
    pub async fn get_reports_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UrbanReport>, ReportError> {
        self.get_list(
            "/time-range",
            &[
                ("start", timestamp::format(&start)),
                ("end", timestamp::format(&end)),
            ],
        )
        .await
    }

    /// Fetches one report. Returns `None` if the backend has no such report
    /// or returns an invalid record.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] on transport failure, a non-success status
    /// other than 404, or a record that fails conversion.
    pub async fn get_report_by_id(&self, id: &str) -> Result<Option<UrbanReport>, ReportError> {
        let resp = self.client.get(self.report_url(id)?).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = check_status(resp).await?.json::<Value>().await?;

        if !is_valid_urban_report_data(&body) {
            log::warn!("Backend returned an invalid record for report {id}");
            return Ok(None);
        }
        Ok(Some(convert_python_urban_report(&body)?))
    }

    /// Submits a report in the backend's wire format.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] on serialization or transport failure, or a
    /// non-success status.
    pub async fn submit_report(&self, report: &UrbanReport) -> Result<SubmitResponse, ReportError> {
        let body = convert_to_api_format(report)?;
        let resp = self.client.post(self.endpoint("")).json(&body).send().await?;
        let ack = check_status(resp).await?.json::<SubmitResponse>().await?;

        log::info!(
            "Submitted report {} (backend id: {})",
            report.id,
            ack.id.as_deref().unwrap_or("none")
        );
        Ok(ack)
    }

    async fn get_list(
        &self,
        suffix: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<UrbanReport>, ReportError> {
        let url = self.endpoint(suffix);
        log::debug!("GET {url}");

        let resp = self.client.get(&url).query(query).send().await?;
        let body = check_status(resp).await?.json::<Value>().await?;
        Ok(parse_report_list(body))
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ReportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    Err(ReportError::Status {
        status: status.as_u16(),
        message: resp.text().await.unwrap_or_default(),
    })
}

fn subscribe_websocket<F>(url: String, mut on_report: F) -> Subscription
where
    F: FnMut(UrbanReport) + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let mut stream = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                log::error!("Failed to connect WebSocket {url}: {e}");
                return;
            }
        };
        log::info!("Connected to live reports at {url}");

        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if let Some(report) = parse_report_message(&text) {
                        on_report(report);
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("WebSocket error on {url}: {e}");
                    break;
                }
            }
        }

        log::info!("Live report channel {url} closed");
    });

    Subscription::new(handle)
}

/// Validates and converts one pushed report message. Returns `None` for
/// anything that is not a valid report record.
#[must_use]
pub fn parse_report_message(text: &str) -> Option<UrbanReport> {
    let record: Value = match serde_json::from_str(text) {
        Ok(record) => record,
        Err(e) => {
            log::warn!("Failed to parse WebSocket message: {e}");
            return None;
        }
    };

    if !is_valid_urban_report_data(&record) {
        log::debug!("Ignoring pushed message that is not a valid report");
        return None;
    }

    match convert_python_urban_report(&record) {
        Ok(report) => Some(report),
        Err(e) => {
            log::warn!("Failed to convert pushed report: {e}");
            None
        }
    }
}

/// Validates and converts a list response body.
fn parse_report_list(body: Value) -> Vec<UrbanReport> {
    match body {
        Value::Array(records) => normalize_records(records),
        other => {
            log::warn!("Expected a JSON array of reports, got {other}");
            vec![]
        }
    }
}

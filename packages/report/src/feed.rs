//! Live report snapshots from the realtime database.
//!
//! The database pushes nothing to us; [`subscribe`] polls a [`ReportFeed`]
//! on an interval and hands every *changed* snapshot to a callback as a
//! complete replacement collection, even when none of its records are
//! valid. Delivery is best-effort: a failed fetch is logged and retried on
//! the next tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::normalize::normalize_snapshot;
use crate::{ReportError, UrbanReport};

/// Default realtime database path holding the report records.
pub const DEFAULT_REPORTS_PATH: &str = "urbanReports";

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// A source of full report snapshots.
#[async_trait]
pub trait ReportFeed: Send + Sync {
    /// Fetches the current raw snapshot. `Ok(None)` means the feed holds no
    /// data at all.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the snapshot cannot be fetched.
    async fn fetch_snapshot(&self) -> Result<Option<Value>, ReportError>;
}

/// Reads report snapshots through the Firebase Realtime Database REST API.
#[derive(Debug, Clone)]
pub struct FirebaseFeed {
    client: reqwest::Client,
    database_url: String,
    path: String,
    auth: Option<String>,
}

impl FirebaseFeed {
    /// Creates a feed reading `{database_url}/{path}.json`.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        database_url: impl Into<String>,
        path: impl Into<String>,
        auth: Option<String>,
    ) -> Self {
        Self {
            client,
            database_url: database_url.into().trim_end_matches('/').to_string(),
            path: path.into().trim_matches('/').to_string(),
            auth,
        }
    }

    /// Creates a feed from `FIREBASE_DATABASE_URL`, `FIREBASE_REPORTS_PATH`
    /// (default [`DEFAULT_REPORTS_PATH`]) and the optional `FIREBASE_AUTH`
    /// token.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if `FIREBASE_DATABASE_URL` is unset,
    /// or [`ReportError::Http`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, ReportError> {
        let database_url =
            std::env::var("FIREBASE_DATABASE_URL").map_err(|_| ReportError::Config {
                message: "FIREBASE_DATABASE_URL environment variable not set".to_string(),
            })?;
        let path = std::env::var("FIREBASE_REPORTS_PATH")
            .unwrap_or_else(|_| DEFAULT_REPORTS_PATH.to_string());
        let auth = std::env::var("FIREBASE_AUTH")
            .ok()
            .filter(|token| !token.is_empty());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self::new(client, database_url, path, auth))
    }

    /// URL of the snapshot document.
    #[must_use]
    pub fn snapshot_url(&self) -> String {
        format!("{}/{}.json", self.database_url, self.path)
    }
}

#[async_trait]
impl ReportFeed for FirebaseFeed {
    async fn fetch_snapshot(&self) -> Result<Option<Value>, ReportError> {
        let mut req = self.client.get(self.snapshot_url());
        if let Some(auth) = &self.auth {
            req = req.query(&[("auth", auth)]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ReportError::Status {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let body: Value = resp.json().await?;
        Ok(if body.is_null() { None } else { Some(body) })
    }
}

/// Handle to a running update loop, from [`subscribe`] or a live report
/// channel. Dropping it stops the loop.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub(crate) const fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    /// Stops the loop and waits for it to wind down. No callback runs after
    /// this returns.
    pub async fn unsubscribe(mut self) {
        self.handle.abort();
        if let Err(e) = (&mut self.handle).await
            && !e.is_cancelled()
        {
            log::warn!("Report subscription ended abnormally: {e}");
        }
    }

    /// Whether the polling loop is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Polls `feed` every `interval` and calls `on_snapshot` with each new
/// normalized collection.
///
/// A missing snapshot or one identical to the previous is skipped, so the
/// caller keeps its prior state. Any other snapshot replaces the
/// collection outright, so one whose records are all invalid delivers an
/// empty collection. Must be called from within a tokio runtime.
pub fn subscribe<F>(feed: Arc<dyn ReportFeed>, interval: Duration, mut on_snapshot: F) -> Subscription
where
    F: FnMut(Vec<UrbanReport>) + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<Value> = None;

        loop {
            ticker.tick().await;

            let snapshot = match feed.fetch_snapshot().await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => {
                    log::debug!("Report feed is empty, keeping current reports");
                    continue;
                }
                Err(e) => {
                    log::warn!("Failed to fetch report snapshot: {e}");
                    continue;
                }
            };

            if last.as_ref() == Some(&snapshot) {
                continue;
            }

            match normalize_snapshot(snapshot.clone()) {
                Ok(reports) => {
                    log::info!("Received report snapshot with {} report(s)", reports.len());
                    on_snapshot(reports);
                }
                Err(e) => log::warn!("Discarding report snapshot: {e}"),
            }

            last = Some(snapshot);
        }
    });

    Subscription::new(handle)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::normalize::convert_to_api_format;
    use crate::seed::demo_reports;

    struct ScriptedFeed {
        script: Mutex<VecDeque<Result<Option<Value>, ReportError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFeed {
        fn new(script: Vec<Result<Option<Value>, ReportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReportFeed for ScriptedFeed {
        async fn fetch_snapshot(&self) -> Result<Option<Value>, ReportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }
    }

    fn snapshot(count: usize) -> Value {
        let records: Vec<Value> = demo_reports(Utc::now())
            .iter()
            .take(count)
            .map(|r| convert_to_api_format(r).unwrap())
            .collect();
        Value::Array(records)
    }

    #[tokio::test]
    async fn delivers_only_changed_snapshots() {
        let first = snapshot(2);
        let second = snapshot(3);
        let feed = ScriptedFeed::new(vec![
            Ok(None),
            Ok(Some(first.clone())),
            Ok(Some(first)),
            Err(ReportError::Config {
                message: "flaky".to_string(),
            }),
            Ok(Some(second)),
        ]);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = subscribe(feed.clone(), Duration::from_millis(5), move |reports| {
            let _ = tx.send(reports.len());
        });

        let wait = Duration::from_secs(5);
        assert_eq!(tokio::time::timeout(wait, rx.recv()).await.unwrap(), Some(2));
        assert_eq!(tokio::time::timeout(wait, rx.recv()).await.unwrap(), Some(3));

        while feed.calls.load(Ordering::SeqCst) < 10 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(rx.try_recv().is_err());

        subscription.unsubscribe().await;
    }

    #[tokio::test]
    async fn all_invalid_snapshot_empties_the_collection() {
        let feed = ScriptedFeed::new(vec![
            Ok(Some(snapshot(5))),
            Ok(Some(json!([{ "id": "x", "request": {} }]))),
            Ok(None),
        ]);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = subscribe(feed.clone(), Duration::from_millis(5), move |reports| {
            let _ = tx.send(reports.len());
        });

        let wait = Duration::from_secs(5);
        assert_eq!(tokio::time::timeout(wait, rx.recv()).await.unwrap(), Some(5));
        assert_eq!(tokio::time::timeout(wait, rx.recv()).await.unwrap(), Some(0));

        while feed.calls.load(Ordering::SeqCst) < 6 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(rx.try_recv().is_err());

        subscription.unsubscribe().await;
    }

    /// Returns a different snapshot on every fetch.
    struct ChangingFeed {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReportFeed for ChangingFeed {
        async fn fetch_snapshot(&self) -> Result<Option<Value>, ReportError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(snapshot(call % 2 + 1)))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn no_delivery_after_unsubscribe_returns() {
        let feed = Arc::new(ChangingFeed {
            calls: AtomicUsize::new(0),
        });
        let delivered = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&delivered);
        let subscription = subscribe(feed, Duration::from_millis(1), move |_| {
            std::thread::sleep(Duration::from_millis(2));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        while delivered.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        subscription.unsubscribe().await;

        let after = delivered.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(delivered.load(Ordering::SeqCst), after);
    }

    #[tokio::test]
    async fn unsubscribe_stops_polling() {
        let feed = ScriptedFeed::new(vec![]);
        let subscription = subscribe(feed.clone(), Duration::from_millis(5), |_| {});

        while feed.calls.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        subscription.unsubscribe().await;

        let calls = feed.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), calls);
    }

    #[test]
    fn firebase_urls_are_normalized() {
        let feed = FirebaseFeed::new(
            reqwest::Client::new(),
            "https://surfaced-demo.firebaseio.com/",
            "/urbanReports/",
            None,
        );
        assert_eq!(
            feed.snapshot_url(),
            "https://surfaced-demo.firebaseio.com/urbanReports.json"
        );
    }
}

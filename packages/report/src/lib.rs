#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Urban report ingestion and querying.
//!
//! Raw records arrive as untyped JSON, either from the reporting backend's
//! REST API ([`api`]) or from a realtime database subscription ([`feed`]).
//! The [`normalize`] boundary validates and converts them into typed
//! [`UrbanReport`]s; invalid records never get past it. The active
//! collection lives in a [`store::SnapshotStore`] that is replaced wholesale
//! on every fresh snapshot, and [`filter`] selects subsets of it on demand.

pub mod api;
pub mod feed;
pub mod filter;
pub mod normalize;
pub mod seed;
pub mod store;

pub use surfaced_report_models::UrbanReport;

use thiserror::Error;

/// Errors from talking to the reporting backend or the realtime feed.
#[derive(Debug, Error)]
pub enum ReportError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record could not be normalized.
    #[error(transparent)]
    Normalize(#[from] normalize::NormalizeError),

    /// The remote answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// Response status code.
        status: u16,
        /// Response body, or a description of it.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

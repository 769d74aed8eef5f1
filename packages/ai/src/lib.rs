#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! AI locality suggestions for natural-language venue queries.
//!
//! A [`LocalitySuggester`] turns a free-text question ("where to party
//! tonight?") into up to three Bengaluru localities plus the venue keywords
//! to search them for. The production implementation talks to Google
//! Gemini ([`gemini`]); the [`fallback`] table supplies canned answers for
//! well-known query shapes when the model's reply can't be read.

pub mod fallback;
pub mod gemini;

use std::sync::LazyLock;

use regex::Regex;
use surfaced_venue_models::{LocalitySuggestions, MAX_SUGGESTED_LOCALITIES};
use thiserror::Error;

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the model provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The model replied, but not with anything shaped like the requested
    /// JSON.
    #[error("Unexpected response format: {message}")]
    Format {
        /// What was wrong with the reply.
        message: String,
    },

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Suggests localities for a natural-language location query.
#[async_trait::async_trait]
pub trait LocalitySuggester: Send + Sync {
    /// Returns at most [`MAX_SUGGESTED_LOCALITIES`] localities, most
    /// relevant first.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Format`] if the upstream reply can't be
    /// interpreted, or another [`AiError`] if the request fails.
    async fn suggest_localities(&self, query: &str) -> Result<LocalitySuggestions, AiError>;
}

/// How a search box query should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Free-text question for the AI suggestion pipeline.
    NaturalLanguage,
    /// A bare place name to look up directly.
    Basic,
}

const NATURAL_LANGUAGE_HINTS: &[&str] = &[
    "where",
    "what",
    "show",
    "find",
    "best",
    "good",
    "near",
    "in",
    "party",
    "restaurant",
    "pub",
    "bar",
    "coffee",
    "nightlife",
    "foodie",
    "uncle",
    "paradise",
    "places",
];

/// Decides whether a search box query is natural language.
///
/// Anything with more than one word, a question mark, or one of the hint
/// words anywhere in it (substring match, case-insensitive) counts.
#[must_use]
pub fn classify_query(query: &str) -> QueryKind {
    let trimmed = query.trim();
    let lower = trimmed.to_lowercase();

    let natural = trimmed.split(' ').count() > 1
        || trimmed.contains('?')
        || NATURAL_LANGUAGE_HINTS.iter().any(|hint| lower.contains(hint));

    if natural {
        QueryKind::NaturalLanguage
    } else {
        QueryKind::Basic
    }
}

static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").unwrap_or_else(|_| unreachable!()));

/// Extracts the outermost JSON object from model output, from the first
/// `{` to the last `}`. Models like to wrap JSON in prose or code fences.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT_RE.find(text).map(|m| m.as_str())
}

/// Parses a suggestion reply from model output, keeping at most
/// [`MAX_SUGGESTED_LOCALITIES`] localities.
///
/// # Errors
///
/// Returns [`AiError::Format`] if the text contains no JSON object, or
/// [`AiError::Json`] if the object doesn't match the expected shape.
pub fn parse_suggestions(text: &str) -> Result<LocalitySuggestions, AiError> {
    let json = extract_json_object(text).ok_or_else(|| AiError::Format {
        message: "no JSON object found in model reply".to_string(),
    })?;

    let mut suggestions: LocalitySuggestions = serde_json::from_str(json)?;

    if suggestions.locations.len() > MAX_SUGGESTED_LOCALITIES {
        log::debug!(
            "Model suggested {} localities, keeping the first {MAX_SUGGESTED_LOCALITIES}",
            suggestions.locations.len()
        );
        suggestions.locations.truncate(MAX_SUGGESTED_LOCALITIES);
    }

    Ok(suggestions)
}

/// Creates a locality suggester from environment variables.
///
/// Reads `GEMINI_API_KEY` (required) and `GEMINI_MODEL` (defaults to
/// [`gemini::DEFAULT_MODEL`]).
///
/// # Errors
///
/// Returns [`AiError::Config`] if `GEMINI_API_KEY` is not set, or
/// [`AiError::Http`] if the HTTP client cannot be built.
pub fn create_suggester_from_env() -> Result<Box<dyn LocalitySuggester>, AiError> {
    Ok(Box::new(gemini::GeminiProvider::from_env()?))
}

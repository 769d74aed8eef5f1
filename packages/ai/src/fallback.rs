//! Compile-time table of canned locality suggestions.
//!
//! Each entry is a TOML file under `fallbacks/` listing trigger keywords
//! and the suggestions to return when a query contains one of them. The
//! table is only consulted when the model's reply can't be interpreted.

use serde::Deserialize;
use surfaced_venue_models::LocalitySuggestions;

/// One canned answer.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackEntry {
    /// Unique identifier (e.g., `"party_hubs"`).
    pub id: String,
    /// Lowercase keywords; a query containing any of them triggers this
    /// entry.
    pub keywords: Vec<String>,
    /// The answer to return.
    pub suggestions: LocalitySuggestions,
}

impl FallbackEntry {
    /// Whether `query` triggers this entry (case-insensitive substring
    /// match).
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.keywords.iter().any(|keyword| query.contains(keyword.as_str()))
    }
}

const FALLBACK_TOMLS: &[(&str, &str)] = &[(
    "party_hubs",
    include_str!("../fallbacks/party_hubs.toml"),
)];

/// Returns every fallback entry, in table order.
///
/// # Panics
///
/// Panics if any embedded TOML file is malformed (the files are part of
/// the build, so this is caught by the tests).
#[must_use]
pub fn all_entries() -> Vec<FallbackEntry> {
    FALLBACK_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse fallback entry '{name}': {e}"))
        })
        .collect()
}

/// Returns the canned suggestions for the first entry `query` triggers.
#[must_use]
pub fn fallback_for(query: &str) -> Option<LocalitySuggestions> {
    all_entries()
        .into_iter()
        .find(|entry| entry.matches(query))
        .map(|entry| {
            log::info!("Using '{}' fallback suggestions for '{query}'", entry.id);
            entry.suggestions
        })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use surfaced_venue_models::MAX_SUGGESTED_LOCALITIES;

    use super::*;

    #[test]
    fn loads_all_entries() {
        let entries = all_entries();
        assert_eq!(entries.len(), FALLBACK_TOMLS.len());

        let mut seen = BTreeSet::new();
        for entry in &entries {
            assert!(seen.insert(&entry.id), "Duplicate fallback ID: {}", entry.id);
            assert!(!entry.suggestions.locations.is_empty());
            assert!(entry.suggestions.locations.len() <= MAX_SUGGESTED_LOCALITIES);
            assert!(
                entry
                    .keywords
                    .iter()
                    .all(|k| k.to_lowercase() == *k && !k.is_empty())
            );
        }
    }

    #[test]
    fn party_queries_get_the_nightlife_hubs() {
        let suggestions = fallback_for("Where can I find a good PUB?").unwrap();
        let names: Vec<&str> = suggestions.locations.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Koramangala", "Indiranagar", "Brigade Road"]);
        assert_eq!(suggestions.query_type, "party_hubs");
        assert_eq!(suggestions.search_terms, ["pubs", "bars", "nightclub"]);

        let koramangala = &suggestions.locations[0];
        assert!((koramangala.coordinates.latitude - 12.9352).abs() < 1e-9);
        assert!((koramangala.coordinates.longitude - 77.6245).abs() < 1e-9);
        assert!(koramangala.tagline.is_none());
    }

    #[test]
    fn unrelated_queries_have_no_fallback() {
        assert!(fallback_for("quiet libraries in Jayanagar").is_none());
    }
}

//! Fixed topic taxonomy for report classification.
//!
//! Every topic tag attached to a report comes from one of these
//! categories. A topic may appear in more than one category (`traffic` is
//! both an authority and a transport concern); lookups resolve to the first
//! category in declaration order.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Top-level topic groupings.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TopicCategory {
    Authority,
    Business,
    Community,
    Health,
    Transport,
    Utility,
    Weather,
    Dining,
    Entertainment,
}

impl TopicCategory {
    /// Returns the topics belonging to this category.
    #[must_use]
    pub const fn topics(self) -> &'static [&'static str] {
        match self {
            Self::Authority => &["traffic", "emergency", "civic", "infrastructure", "safety"],
            Self::Business => &["opening", "closing", "promotion", "service", "hiring"],
            Self::Community => &["event", "gathering", "celebration", "protest", "meeting"],
            Self::Health => &["medical", "wellness", "epidemic", "health_alert"],
            Self::Transport => &[
                "metro",
                "bus",
                "traffic",
                "parking",
                "road_closure",
                "air_transport",
            ],
            Self::Utility => &["power", "water", "internet", "maintenance"],
            Self::Weather => &["rain", "flood", "heat_wave", "storm", "aqi"],
            Self::Dining => &["new_restaurant", "food_festival", "offers", "reviews"],
            Self::Entertainment => &["movie", "concert", "theater", "sports"],
        }
    }

    /// Returns all variants of this enum, in lookup order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Authority,
            Self::Business,
            Self::Community,
            Self::Health,
            Self::Transport,
            Self::Utility,
            Self::Weather,
            Self::Dining,
            Self::Entertainment,
        ]
    }
}

/// Looks up the category of a topic tag.
///
/// Matching is exact and case-sensitive.
#[must_use]
pub fn topic_category(topic: &str) -> Option<TopicCategory> {
    TopicCategory::all()
        .iter()
        .copied()
        .find(|category| category.topics().contains(&topic))
}

/// Returns every topic in the taxonomy, flattened in category order.
///
/// Topics shared by several categories appear once per category.
#[must_use]
pub fn all_topics() -> Vec<&'static str> {
    TopicCategory::all()
        .iter()
        .flat_map(|category| category.topics().iter().copied())
        .collect()
}

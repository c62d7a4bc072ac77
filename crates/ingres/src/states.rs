//! Indian states/UTs and the collection layout built on them

use clap::ValueEnum;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// States and union territories covered by the dataset
pub const ALL_STATES: [&str; 32] = [
  "Andaman and Nicobar Islands",
  "Bihar",
  "Arunachal Pradesh",
  "Assam",
  "Chhattisgarh",
  "Goa",
  "Gujarat",
  "Haryana",
  "Himachal Pradesh",
  "Jharkhand",
  "Karnataka",
  "Kerala",
  "Madhya Pradesh",
  "Maharashtra",
  "Manipur",
  "Meghalaya",
  "Mizoram",
  "Nagaland",
  "Odisha",
  "Punjab",
  "Rajasthan",
  "Sikkim",
  "Tamil Nadu",
  "Telangana",
  "Tripura",
  "Uttar Pradesh",
  "Uttarakhand",
  "West Bengal",
  "Jammu and Kashmir",
  "Ladakh",
  "Delhi",
  "Puducherry",
];

static STATE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
  ALL_STATES
    .iter()
    .filter_map(|state| {
      let pattern = format!(r"(?i)\b{}\b", regex::escape(state));
      Regex::new(&pattern).ok().map(|re| (*state, re))
    })
    .collect()
});

/// States named in `query` (whole-word, case-insensitive), in list order
pub fn extract_states_from_query(query: &str) -> Vec<&'static str> {
  STATE_PATTERNS.iter().filter(|(_, re)| re.is_match(query)).map(|(state, _)| *state).collect()
}

/// `Tamil Nadu` -> `TAMIL_NADU`
pub fn state_slug(state: &str) -> String {
  state.trim().replace(' ', "_").to_uppercase()
}

/// How records are spread over vector-store collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
  /// Everything in one collection
  #[default]
  Shared,
  /// One collection per state
  PerState,
}

/// Collection naming shared by ingestion and querying
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionLayout {
  Shared { name: String },
  PerState { prefix: String },
}

impl CollectionLayout {
  pub fn new(kind: LayoutKind, collection: &str, prefix: &str) -> Self {
    match kind {
      LayoutKind::Shared => CollectionLayout::Shared { name: collection.to_string() },
      LayoutKind::PerState => CollectionLayout::PerState { prefix: prefix.to_string() },
    }
  }

  /// Collection that stores a record from `state`
  pub fn collection_for_state(&self, state: &str) -> String {
    match self {
      CollectionLayout::Shared { name } => name.clone(),
      CollectionLayout::PerState { prefix } => format!("{prefix}{}", state_slug(state)),
    }
  }

  /// Collections to search for `query`; per-state layouts fall back to every
  /// state when the query names none
  pub fn collections_for_query(&self, query: &str) -> Vec<String> {
    match self {
      CollectionLayout::Shared { name } => vec![name.clone()],
      CollectionLayout::PerState { .. } => {
        let mut states = extract_states_from_query(query);
        if states.is_empty() {
          tracing::warn!("No state detected in query, searching all state collections");
          states = ALL_STATES.to_vec();
        }
        states.into_iter().map(|state| self.collection_for_state(state)).collect()
      }
    }
  }
}

//! In-memory match data provider
//!
//! Serves preloaded events and seasons. Used by the offline replay tool and by
//! tests that need a provider without network access.

use crate::error::{RatingError, Result};
use crate::provider::MatchDataProvider;
use crate::types::MatchRecord;
use crate::utils::canonical_event_key;
use async_trait::async_trait;
use std::collections::HashMap;

/// Provider backed by fixed maps of events and seasons
#[derive(Debug, Clone, Default)]
pub struct StaticMatchProvider {
    events: HashMap<String, Vec<MatchRecord>>,
    seasons: HashMap<i32, Vec<String>>,
}

impl StaticMatchProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event's matches and list it under its season
    ///
    /// The season is taken from the first four characters of the key.
    pub fn with_event(mut self, event_key: &str, matches: Vec<MatchRecord>) -> Self {
        let key = canonical_event_key(event_key);
        if let Some(year) = key.get(..4).and_then(|y| y.parse::<i32>().ok()) {
            let season = self.seasons.entry(year).or_default();
            if !season.contains(&key) {
                season.push(key.clone());
            }
        }
        self.events.insert(key, matches);
        self
    }

    /// Replace the event list for a season
    pub fn with_season(mut self, year: i32, event_keys: Vec<String>) -> Self {
        self.seasons.insert(year, event_keys);
        self
    }
}

#[async_trait]
impl MatchDataProvider for StaticMatchProvider {
    async fn event_matches(&self, event_key: &str) -> Result<Vec<MatchRecord>> {
        self.events
            .get(&canonical_event_key(event_key))
            .cloned()
            .ok_or_else(|| RatingError::provider(format!("Unknown event {}", event_key)).into())
    }

    async fn season_events(&self, year: i32) -> Result<Vec<String>> {
        Ok(self.seasons.get(&year).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

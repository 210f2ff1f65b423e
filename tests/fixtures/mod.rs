//! Test fixtures and provider doubles for integration testing

#![allow(dead_code)]

use alliance_rating::config::AppConfig;
use alliance_rating::error::{RatingError, Result};
use alliance_rating::metrics::MetricsCollector;
use alliance_rating::provider::{MatchDataProvider, StaticMatchProvider};
use alliance_rating::service::AppState;
use alliance_rating::types::{CompLevel, MatchRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Qualification matches of a small six-team event, out of order on purpose
pub fn small_event(event_key: &str) -> Vec<MatchRecord> {
    vec![
        MatchRecord::scored(["frc3", "frc4", "frc5"], ["frc6", "frc1", "frc2"], 61.0, 48.0)
            .with_timestamp(1_711_903_600)
            .with_phase(CompLevel::Qualification, 1, 3)
            .with_event(event_key),
        MatchRecord::scored(["frc1", "frc2", "frc3"], ["frc4", "frc5", "frc6"], 72.0, 55.0)
            .with_timestamp(1_711_900_000)
            .with_phase(CompLevel::Qualification, 1, 1)
            .with_event(event_key),
        MatchRecord::scored(["frc1", "frc4", "frc6"], ["frc2", "frc3", "frc5"], 50.0, 50.0)
            .with_timestamp(1_711_901_800)
            .with_phase(CompLevel::Qualification, 1, 2)
            .with_event(event_key),
        // Not played yet
        MatchRecord::scored(["frc1", "frc2", "frc3"], ["frc4", "frc5", "frc6"], -1.0, -1.0)
            .with_timestamp(1_711_905_400)
            .with_phase(CompLevel::Qualification, 1, 4)
            .with_event(event_key),
    ]
}

/// A season of `events` events, each replaying `small_event` under its own key
pub fn static_season(year: i32, events: usize) -> StaticMatchProvider {
    (0..events).fold(StaticMatchProvider::new(), |provider, i| {
        let key = format!("{}ev{}", year, i + 1);
        let matches = small_event(&key);
        provider.with_event(&key, matches)
    })
}

/// Provider that serves a fixed season and fails on one chosen event
pub struct ScriptedProvider {
    year: i32,
    events: Vec<String>,
    matches: HashMap<String, Vec<MatchRecord>>,
    fail_on: Option<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn new(year: i32, events: usize) -> Self {
        let events: Vec<String> = (0..events).map(|i| format!("{}ev{}", year, i + 1)).collect();
        let matches = events
            .iter()
            .enumerate()
            .map(|(i, key)| {
                // Distinct teams per event so partial application would be visible
                let offset = (i + 1) * 100;
                let record = MatchRecord::scored(
                    [format!("frc{}", offset), format!("frc{}", offset + 1)],
                    [format!("frc{}", offset + 2), format!("frc{}", offset + 3)],
                    30.0,
                    10.0,
                )
                .with_event(key.clone());
                (key.clone(), vec![record])
            })
            .collect();

        Self {
            year,
            events,
            matches,
            fail_on: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail the fetch of the `index`-th event (1-based)
    pub fn failing_on(mut self, index: usize) -> Self {
        self.fail_on = self.events.get(index - 1).cloned();
        self
    }

    /// Event keys whose matches were requested, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MatchDataProvider for ScriptedProvider {
    async fn event_matches(&self, event_key: &str) -> Result<Vec<MatchRecord>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(event_key.to_string());
        }

        // Simulate network latency
        tokio::time::sleep(tokio::time::Duration::from_millis(2)).await;

        if self.fail_on.as_deref() == Some(event_key) {
            return Err(RatingError::provider(format!(
                "TBA API request failed (status 503) for event {}",
                event_key
            ))
            .into());
        }
        Ok(self.matches.get(event_key).cloned().unwrap_or_default())
    }

    async fn season_events(&self, year: i32) -> Result<Vec<String>> {
        if year == self.year {
            Ok(self.events.clone())
        } else {
            Ok(Vec::new())
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Application state over `provider` with its snapshot under `dir`
pub fn test_app(provider: Arc<dyn MatchDataProvider>, dir: &Path) -> AppState {
    let mut config = AppConfig::default();
    config.storage.data_path = dir.join("ratings.json");
    AppState::new(
        config,
        provider,
        Arc::new(MetricsCollector::new().expect("Failed to create metrics collector")),
    )
    .expect("Failed to create app state")
}

//! Rating storage interface and implementations
//!
//! This module defines the interface for holding team beliefs. Stores are plain
//! owned values; the engine wraps them in a lock so a whole batch of matches is
//! applied under one exclusive critical section.

use crate::types::{TeamBelief, TeamKey};
use crate::utils::canonical_team_key;
use std::collections::BTreeMap;

/// Trait for rating storage operations
///
/// Keys are canonicalised on every call, so `" FRC1"` and `"frc1"` address the
/// same entry and the store never holds duplicates.
pub trait RatingStore: Send + Sync {
    /// Get a team's belief without creating it
    fn get(&self, team_key: &str) -> Option<TeamBelief>;

    /// Get a team's belief, inserting `prior` on first reference
    fn get_or_create(&mut self, team_key: &str, prior: TeamBelief) -> TeamBelief;

    /// Overwrite several beliefs in one step
    fn store_many(&mut self, entries: Vec<(TeamKey, TeamBelief)>);

    /// Remove every belief
    fn clear(&mut self);

    /// Atomically replace the whole store
    fn replace_all(&mut self, entries: Vec<(TeamKey, TeamBelief)>);

    /// All entries sorted by key
    fn snapshot_entries(&self) -> Vec<(TeamKey, TeamBelief)>;

    /// Number of teams held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, team_key: &str) -> bool {
        self.get(team_key).is_some()
    }
}

/// In-memory rating store backed by an ordered map
#[derive(Debug, Clone, Default)]
pub struct InMemoryRatingStore {
    beliefs: BTreeMap<TeamKey, TeamBelief>,
}

impl InMemoryRatingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from existing entries
    pub fn from_entries(entries: Vec<(TeamKey, TeamBelief)>) -> Self {
        let mut store = Self::new();
        store.replace_all(entries);
        store
    }
}

impl RatingStore for InMemoryRatingStore {
    fn get(&self, team_key: &str) -> Option<TeamBelief> {
        self.beliefs.get(&canonical_team_key(team_key)).copied()
    }

    fn get_or_create(&mut self, team_key: &str, prior: TeamBelief) -> TeamBelief {
        *self
            .beliefs
            .entry(canonical_team_key(team_key))
            .or_insert(prior)
    }

    fn store_many(&mut self, entries: Vec<(TeamKey, TeamBelief)>) {
        for (team_key, belief) in entries {
            self.beliefs.insert(canonical_team_key(&team_key), belief);
        }
    }

    fn clear(&mut self) {
        self.beliefs.clear();
    }

    fn replace_all(&mut self, entries: Vec<(TeamKey, TeamBelief)>) {
        let mut replacement = BTreeMap::new();
        for (team_key, belief) in entries {
            replacement.insert(canonical_team_key(&team_key), belief);
        }
        self.beliefs = replacement;
    }

    fn snapshot_entries(&self) -> Vec<(TeamKey, TeamBelief)> {
        self.beliefs
            .iter()
            .map(|(key, belief)| (key.clone(), *belief))
            .collect()
    }

    fn len(&self) -> usize {
        self.beliefs.len()
    }
}

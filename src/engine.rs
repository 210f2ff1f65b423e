//! Rating engine
//!
//! `RatingEngine` owns the belief store, the active environment and the session
//! context behind a single reader/writer lock. Readers (lookups, predictions,
//! leaderboard, export) share the lock; every write (rebuild, incremental push,
//! import, environment swap, reset) takes it exclusively for the whole batch,
//! so a reader never sees a partially applied batch.
//!
//! Matches are replayed into a scratch overlay first and committed to the store
//! in one step, so an error part-way through a batch leaves the store as it was.

use crate::error::{RatingError, Result};
use crate::rating::calculator::RatingCalculator;
use crate::rating::confidence::{prediction_confidence, standing};
use crate::rating::environment::{floor_sigma, RatingEnvironment};
use crate::rating::sequencer::{sequence, SequencedMatches};
use crate::rating::storage::{InMemoryRatingStore, RatingStore};
use crate::rating::trueskill::TrueSkillCalculator;
use crate::snapshot::codec::{RatingSnapshot, SnapshotImport, DEFAULT_SOURCE};
use crate::types::{
    Alliance, ApplySummary, BatchPrediction, MatchPrediction, MatchRecord, MatchupRequest,
    SessionContext, TeamBelief, TeamKey, TeamStanding, ValidatedMatch,
};
use crate::utils::canonical_team_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Outcome of a snapshot import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Teams held after the import
    pub teams_indexed: usize,
    /// Team entries dropped as malformed
    pub skipped: usize,
    /// Whether the snapshot's environment replaced the active one
    pub env_applied: bool,
}

struct EngineState<S> {
    env: RatingEnvironment,
    store: S,
    context: SessionContext,
}

/// Thread-safe rating engine
pub struct RatingEngine<S: RatingStore = InMemoryRatingStore> {
    state: RwLock<EngineState<S>>,
    calculator: Arc<dyn RatingCalculator>,
}

impl RatingEngine<InMemoryRatingStore> {
    /// Create an empty in-memory engine with the TrueSkill calculator
    pub fn new(env: RatingEnvironment) -> Result<Self> {
        Self::with_store(env, InMemoryRatingStore::new(), Arc::new(TrueSkillCalculator::new()))
    }
}

impl Default for RatingEngine<InMemoryRatingStore> {
    fn default() -> Self {
        Self {
            state: RwLock::new(EngineState {
                env: RatingEnvironment::default(),
                store: InMemoryRatingStore::new(),
                context: SessionContext::default(),
            }),
            calculator: Arc::new(TrueSkillCalculator::new()),
        }
    }
}

impl<S: RatingStore> RatingEngine<S> {
    /// Create an engine over an existing store and calculator
    pub fn with_store(
        env: RatingEnvironment,
        store: S,
        calculator: Arc<dyn RatingCalculator>,
    ) -> Result<Self> {
        env.validate()?;
        info!(
            "Rating engine using {} (mu={}, sigma={:.4}, beta={:.4}, tau={:.4}, draw={})",
            calculator.name(),
            env.mu,
            env.sigma,
            env.beta,
            env.tau,
            env.draw_probability
        );
        Ok(Self {
            state: RwLock::new(EngineState {
                env,
                store,
                context: SessionContext::default(),
            }),
            calculator,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, EngineState<S>>> {
        self.state.read().map_err(|_| {
            RatingError::Internal {
                message: "Failed to acquire ratings read lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, EngineState<S>>> {
        self.state.write().map_err(|_| {
            RatingError::Internal {
                message: "Failed to acquire ratings write lock".to_string(),
            }
            .into()
        })
    }

    /// Replay sequenced matches on top of `base` without touching it
    ///
    /// With `base == None` every team starts from the prior.
    fn replay(
        &self,
        env: &RatingEnvironment,
        base: Option<&S>,
        matches: &[ValidatedMatch],
    ) -> Result<BTreeMap<TeamKey, TeamBelief>> {
        let mut overlay: BTreeMap<TeamKey, TeamBelief> = BTreeMap::new();

        let current = |overlay: &BTreeMap<TeamKey, TeamBelief>, key: &TeamKey| {
            overlay
                .get(key)
                .copied()
                .or_else(|| base.and_then(|store| store.get(key)))
                .unwrap_or_else(|| env.prior())
        };

        for validated in matches {
            let beliefs_a: Vec<TeamBelief> = validated
                .alliance_a
                .iter()
                .map(|key| current(&overlay, key))
                .collect();
            let beliefs_b: Vec<TeamBelief> = validated
                .alliance_b
                .iter()
                .map(|key| current(&overlay, key))
                .collect();

            let result = self
                .calculator
                .rate_match(env, &beliefs_a, &beliefs_b, validated.outcome)?;

            for (key, belief) in validated.alliance_a.iter().zip(result.alliance_a) {
                overlay.insert(key.clone(), belief);
            }
            for (key, belief) in validated.alliance_b.iter().zip(result.alliance_b) {
                overlay.insert(key.clone(), belief);
            }
        }

        Ok(overlay)
    }

    /// Clear the store and replay `records` from priors as one exclusive step
    ///
    /// Records are validated and ordered before the lock is taken. The session
    /// context is replaced with `context`.
    pub fn rebuild_from(&self, records: &[MatchRecord], context: SessionContext) -> Result<ApplySummary> {
        let sequenced = sequence(records);
        self.rebuild_sequenced(&sequenced, context)
    }

    /// Clear the store and replay already sequenced matches
    pub fn rebuild_sequenced(
        &self,
        sequenced: &SequencedMatches,
        context: SessionContext,
    ) -> Result<ApplySummary> {
        let mut state = self.write()?;
        let env = state.env;
        let rebuilt = self.replay(&env, None, &sequenced.matches)?;

        state.store.replace_all(rebuilt.into_iter().collect());
        state.context = context;

        let summary = ApplySummary {
            applied: sequenced.matches.len(),
            skipped: sequenced.skipped,
            teams_indexed: state.store.len(),
        };
        info!(
            "Rebuilt ratings: {} matches applied, {} skipped, {} teams indexed",
            summary.applied, summary.skipped, summary.teams_indexed
        );
        Ok(summary)
    }

    /// Apply externally supplied results on top of the current beliefs
    pub fn push_incremental(&self, records: &[MatchRecord]) -> Result<ApplySummary> {
        let sequenced = sequence(records);

        let mut state = self.write()?;
        let env = state.env;
        let updated = self.replay(&env, Some(&state.store), &sequenced.matches)?;
        state.store.store_many(updated.into_iter().collect());

        let summary = ApplySummary {
            applied: sequenced.matches.len(),
            skipped: sequenced.skipped,
            teams_indexed: state.store.len(),
        };
        info!(
            "Pushed results: {} matches applied, {} skipped, {} teams indexed",
            summary.applied, summary.skipped, summary.teams_indexed
        );
        Ok(summary)
    }

    fn checked_key(team_key: &str) -> Result<TeamKey> {
        let key = canonical_team_key(team_key);
        if key.is_empty() {
            return Err(RatingError::validation("Team key must not be empty").into());
        }
        Ok(key)
    }

    fn checked_alliance(alliance: &[String], side: &str) -> Result<Alliance> {
        if alliance.is_empty() {
            return Err(RatingError::validation(format!("Alliance {} must not be empty", side)).into());
        }
        alliance.iter().map(|key| Self::checked_key(key)).collect()
    }

    /// Current belief for a team, without creating it
    pub fn get_belief(&self, team_key: &str) -> Result<Option<TeamBelief>> {
        let key = Self::checked_key(team_key)?;
        Ok(self.read()?.store.get(&key))
    }

    /// Presentation view of a team; unknown teams are `TeamNotFound`
    pub fn team_view(&self, team_key: &str) -> Result<TeamStanding> {
        let key = Self::checked_key(team_key)?;
        let state = self.read()?;
        let belief = state
            .store
            .get(&key)
            .ok_or_else(|| RatingError::TeamNotFound {
                team_key: key.clone(),
            })?;
        Ok(standing(key, belief, &state.env))
    }

    /// Current belief for a team, materialising the prior on first reference
    pub fn get_or_create(&self, team_key: &str) -> Result<TeamBelief> {
        let key = Self::checked_key(team_key)?;
        let mut state = self.write()?;
        let prior = state.env.prior();
        Ok(state.store.get_or_create(&key, prior))
    }

    /// Win probabilities for a hypothetical matchup
    ///
    /// Teams never seen before are scored at the prior and then inserted with
    /// the prior, only if still absent.
    pub fn predict(&self, alliance_a: &[String], alliance_b: &[String]) -> Result<MatchPrediction> {
        let alliance_a = Self::checked_alliance(alliance_a, "A")?;
        let alliance_b = Self::checked_alliance(alliance_b, "B")?;

        let (win_probability_a, missing) = {
            let state = self.read()?;
            let mut missing = Vec::new();
            let mut resolve = |alliance: &[TeamKey]| -> Vec<TeamBelief> {
                alliance
                    .iter()
                    .map(|key| {
                        state.store.get(key).unwrap_or_else(|| {
                            missing.push(key.clone());
                            state.env.prior()
                        })
                    })
                    .collect()
            };
            let beliefs_a = resolve(&alliance_a);
            let beliefs_b = resolve(&alliance_b);
            let p = self
                .calculator
                .win_probability(&state.env, &beliefs_a, &beliefs_b);
            (p, missing)
        };

        if !missing.is_empty() {
            let mut state = self.write()?;
            let prior = state.env.prior();
            for key in &missing {
                state.store.get_or_create(key, prior);
            }
            debug!("Materialised {} unseen teams during prediction", missing.len());
        }

        Ok(MatchPrediction {
            win_probability_a,
            win_probability_b: 1.0 - win_probability_a,
            prediction_confidence_percent: prediction_confidence(win_probability_a),
        })
    }

    /// Answer several matchups; a bad pair carries an error instead of failing the batch
    pub fn predict_batch(&self, requests: &[MatchupRequest]) -> Vec<BatchPrediction> {
        requests
            .iter()
            .map(|request| match self.predict(&request.alliance_a, &request.alliance_b) {
                Ok(prediction) => BatchPrediction {
                    alliance_a: request.alliance_a.clone(),
                    alliance_b: request.alliance_b.clone(),
                    prediction: Some(prediction),
                    error: None,
                },
                Err(e) => {
                    debug!("Batch prediction entry rejected: {}", e);
                    BatchPrediction {
                        alliance_a: request.alliance_a.clone(),
                        alliance_b: request.alliance_b.clone(),
                        prediction: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect()
    }

    /// Build a snapshot of the current state
    pub fn export_snapshot(&self) -> Result<RatingSnapshot> {
        self.export_snapshot_with_source(DEFAULT_SOURCE)
    }

    /// Build a snapshot with a custom provenance string
    pub fn export_snapshot_with_source(&self, source: &str) -> Result<RatingSnapshot> {
        let state = self.read()?;
        Ok(RatingSnapshot::capture(
            &state.env,
            state.store.snapshot_entries(),
            &state.context,
            source,
        ))
    }

    /// Replace the store, and optionally the environment, from a snapshot
    ///
    /// An embedded environment that fails validation is ignored and the team
    /// import still proceeds.
    pub fn import_snapshot(
        &self,
        snapshot: impl Into<SnapshotImport>,
        use_env_from_snapshot: bool,
    ) -> Result<ImportSummary> {
        let snapshot = snapshot.into();

        let mut state = self.write()?;
        let mut env_applied = false;
        if use_env_from_snapshot {
            match snapshot.env.resolve(&state.env) {
                Ok(env) => {
                    state.env = env;
                    env_applied = true;
                }
                Err(e) => warn!("Ignoring invalid environment in snapshot: {}", e),
            }
        }

        state.store.replace_all(
            snapshot
                .entries
                .into_iter()
                .map(|(key, belief)| (key, TeamBelief::new(belief.mu, floor_sigma(belief.sigma))))
                .collect(),
        );
        state.context = snapshot.context;

        let summary = ImportSummary {
            teams_indexed: state.store.len(),
            skipped: snapshot.skipped,
            env_applied,
        };
        info!(
            "Imported snapshot: {} teams, {} malformed entries skipped",
            summary.teams_indexed, summary.skipped
        );
        Ok(summary)
    }

    /// All teams by conservative estimate, highest first; ties by key
    pub fn leaderboard(&self) -> Result<Vec<TeamStanding>> {
        let state = self.read()?;
        let mut standings: Vec<TeamStanding> = state
            .store
            .snapshot_entries()
            .into_iter()
            .map(|(key, belief)| standing(key, belief, &state.env))
            .collect();
        standings.sort_by(|a, b| {
            b.conservative_mu_3sigma
                .total_cmp(&a.conservative_mu_3sigma)
                .then_with(|| a.team_key.cmp(&b.team_key))
        });
        Ok(standings)
    }

    /// Active environment
    pub fn environment(&self) -> Result<RatingEnvironment> {
        Ok(self.read()?.env)
    }

    /// Swap in a new environment; existing beliefs are not rescaled
    pub fn replace_environment(&self, env: RatingEnvironment) -> Result<()> {
        env.validate()?;
        self.write()?.env = env;
        info!("Rating environment replaced");
        Ok(())
    }

    /// Remove every belief and clear the session context
    pub fn reset(&self) -> Result<()> {
        let mut state = self.write()?;
        state.store.clear();
        state.context = SessionContext::default();
        Ok(())
    }

    pub fn team_count(&self) -> Result<usize> {
        Ok(self.read()?.store.len())
    }

    pub fn context(&self) -> Result<SessionContext> {
        Ok(self.read()?.context.clone())
    }

    pub fn calculator_name(&self) -> &'static str {
        self.calculator.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use crate::rating::environment::MIN_SIGMA;

    fn engine() -> RatingEngine {
        RatingEngine::new(RatingEnvironment::default()).unwrap()
    }

    fn keys(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unknown_team_not_found_then_materialised() {
        let engine = engine();
        assert_eq!(engine.get_belief("frc999").unwrap(), None);
        let err = engine.team_view("frc999").unwrap_err();
        assert!(matches!(classify(&err), Some(RatingError::TeamNotFound { .. })));

        engine.predict(&keys(&["frc999"]), &keys(&["frc1"])).unwrap();
        let prior = RatingEnvironment::default().prior();
        assert_eq!(engine.get_belief("FRC999").unwrap(), Some(prior));
        assert_eq!(engine.team_count().unwrap(), 2);
    }

    #[test]
    fn test_empty_key_is_validation_error() {
        let engine = engine();
        let err = engine.get_belief("   ").unwrap_err();
        assert!(matches!(classify(&err), Some(RatingError::Validation { .. })));

        let err = engine.predict(&[], &keys(&["frc1"])).unwrap_err();
        assert!(matches!(classify(&err), Some(RatingError::Validation { .. })));
        assert_eq!(engine.team_count().unwrap(), 0);
    }

    #[test]
    fn test_push_skips_malformed_record() {
        let valid = MatchRecord::scored(["frc1", "frc2"], ["frc3", "frc4"], 80.0, 60.0);
        let malformed = MatchRecord::scored(["frc5"], ["frc6"], -1.0, 20.0);

        let only_valid = engine();
        only_valid.push_incremental(&[valid.clone()]).unwrap();

        let mixed = engine();
        let summary = mixed.push_incremental(&[valid, malformed]).unwrap();

        assert_eq!(summary.applied, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.teams_indexed, 4);
        assert_eq!(
            mixed.export_snapshot().unwrap().teams,
            only_valid.export_snapshot().unwrap().teams
        );
    }

    #[test]
    fn test_push_builds_on_existing_beliefs() {
        let engine = engine();
        let record = MatchRecord::scored(["frc1"], ["frc2"], 10.0, 5.0);
        engine.push_incremental(&[record.clone()]).unwrap();
        let after_one = engine.get_belief("frc1").unwrap().unwrap();
        engine.push_incremental(&[record]).unwrap();
        let after_two = engine.get_belief("frc1").unwrap().unwrap();

        assert!(after_two.mu > after_one.mu);
    }

    #[test]
    fn test_rebuild_replaces_state_and_context() {
        let engine = engine();
        engine
            .push_incremental(&[MatchRecord::scored(["frc100"], ["frc200"], 1.0, 0.0)])
            .unwrap();

        let context = SessionContext {
            event_key: Some("2024casj".to_string()),
            year: None,
        };
        let summary = engine
            .rebuild_from(&[MatchRecord::scored(["frc1"], ["frc2"], 1.0, 0.0)], context.clone())
            .unwrap();

        assert_eq!(summary.teams_indexed, 2);
        assert_eq!(engine.get_belief("frc100").unwrap(), None);
        assert_eq!(engine.context().unwrap(), context);
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let records = vec![
            MatchRecord::scored(["frc1", "frc2"], ["frc3", "frc4"], 50.0, 40.0).with_timestamp(30),
            MatchRecord::scored(["frc1", "frc3"], ["frc2", "frc4"], 20.0, 20.0).with_timestamp(10),
            MatchRecord::scored(["frc4", "frc2"], ["frc3", "frc1"], 70.0, 90.0).with_timestamp(20),
        ];

        let engine = engine();
        engine.rebuild_from(&records, SessionContext::default()).unwrap();
        let first = engine.export_snapshot().unwrap().teams;
        engine.rebuild_from(&records, SessionContext::default()).unwrap();
        let second = engine.export_snapshot().unwrap().teams;

        assert_eq!(first, second);
    }

    #[test]
    fn test_prediction_sums_to_one() {
        let engine = engine();
        engine
            .push_incremental(&[MatchRecord::scored(["frc1"], ["frc2"], 3.0, 1.0)])
            .unwrap();

        let prediction = engine.predict(&keys(&["frc1"]), &keys(&["frc2"])).unwrap();
        assert!(prediction.win_probability_a > 0.5);
        assert!((prediction.win_probability_a + prediction.win_probability_b - 1.0).abs() < 1e-9);
        assert!(prediction.prediction_confidence_percent > 0.0);
    }

    #[test]
    fn test_predict_batch_reports_errors_per_entry() {
        let engine = engine();
        let requests = vec![
            MatchupRequest {
                alliance_a: keys(&["frc1"]),
                alliance_b: keys(&["frc2"]),
            },
            MatchupRequest {
                alliance_a: keys(&[]),
                alliance_b: keys(&["frc2"]),
            },
        ];

        let results = engine.predict_batch(&requests);
        assert_eq!(results.len(), 2);
        assert!(results[0].prediction.is_some());
        assert!(results[1].prediction.is_none());
        assert!(results[1].error.as_deref().unwrap().contains("empty"));
    }

    #[test]
    fn test_leaderboard_order() {
        let engine = engine();
        engine
            .import_snapshot(
                SnapshotImport {
                    entries: vec![
                        ("frc1".to_string(), TeamBelief::new(25.0, 5.0)),
                        ("frc2".to_string(), TeamBelief::new(30.0, 2.0)),
                        ("frc3".to_string(), TeamBelief::new(25.0, 5.0)),
                    ],
                    ..SnapshotImport::default()
                },
                false,
            )
            .unwrap();

        let order: Vec<String> = engine
            .leaderboard()
            .unwrap()
            .into_iter()
            .map(|s| s.team_key)
            .collect();
        assert_eq!(order, vec!["frc2", "frc1", "frc3"]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let source = engine();
        source
            .rebuild_from(
                &[
                    MatchRecord::scored(["frc1", "frc2"], ["frc3", "frc4"], 50.0, 40.0),
                    MatchRecord::scored(["frc1", "frc3"], ["frc2", "frc4"], 20.0, 20.0),
                ],
                SessionContext {
                    event_key: None,
                    year: Some(2024),
                },
            )
            .unwrap();

        let json = source.export_snapshot().unwrap().to_json().unwrap();
        let restored = engine();
        restored
            .import_snapshot(SnapshotImport::from_json(&json).unwrap(), true)
            .unwrap();

        for key in ["frc1", "frc2", "frc3", "frc4"] {
            let a = source.get_belief(key).unwrap().unwrap();
            let b = restored.get_belief(key).unwrap().unwrap();
            assert!((a.mu - b.mu).abs() < 1e-9);
            assert!((a.sigma - b.sigma).abs() < 1e-9);
        }
        assert_eq!(restored.context().unwrap().year, Some(2024));
    }

    #[test]
    fn test_import_with_invalid_env_keeps_current() {
        let engine = engine();
        let json = r#"{"meta": {"env": {"sigma": -2.0}}, "teams": [{"team_key": "frc1", "mu": 20, "sigma": 3}]}"#;

        let summary = engine
            .import_snapshot(SnapshotImport::from_json(json).unwrap(), true)
            .unwrap();

        assert!(!summary.env_applied);
        assert_eq!(summary.teams_indexed, 1);
        assert_eq!(engine.environment().unwrap(), RatingEnvironment::default());
    }

    #[test]
    fn test_import_never_stores_sigma_below_floor() {
        let engine = engine();
        let json = r#"{"teams": [
            {"team_key": "frc1", "mu": 20, "sigma": -5},
            {"team_key": "frc2", "mu": 25, "sigma": 0},
            {"team_key": "frc3", "mu": 22, "sigma": 2}
        ]}"#;

        let summary = engine
            .import_snapshot(SnapshotImport::from_json(json).unwrap(), true)
            .unwrap();
        assert_eq!(summary.teams_indexed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(engine.get_belief("frc1").unwrap(), None);

        let leaderboard = engine.leaderboard().unwrap();
        for team in &leaderboard {
            assert!(team.sigma >= MIN_SIGMA);
            assert!(team.conservative_mu_3sigma <= team.mu);
        }
        assert_eq!(leaderboard[0].team_key, "frc2");
    }

    #[test]
    fn test_replace_environment_does_not_rescale() {
        let engine = engine();
        engine.get_or_create("frc1").unwrap();

        let env = RatingEnvironment::new(1500.0, 200.0, 100.0, 2.0, 0.0).unwrap();
        engine.replace_environment(env).unwrap();

        assert_eq!(engine.get_belief("frc1").unwrap(), Some(RatingEnvironment::default().prior()));
        assert_eq!(engine.get_or_create("frc2").unwrap(), env.prior());
        assert!(engine
            .replace_environment(RatingEnvironment {
                draw_probability: 1.5,
                ..env
            })
            .is_err());
    }

    #[test]
    fn test_reset() {
        let engine = engine();
        engine
            .rebuild_from(
                &[MatchRecord::scored(["frc1"], ["frc2"], 1.0, 0.0)],
                SessionContext {
                    event_key: Some("2024casj".to_string()),
                    year: None,
                },
            )
            .unwrap();

        engine.reset().unwrap();
        assert_eq!(engine.team_count().unwrap(), 0);
        assert_eq!(engine.context().unwrap(), SessionContext::default());
    }
}

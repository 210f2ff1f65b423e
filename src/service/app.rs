//! Main application state and service coordination
//!
//! `AppState` ties the rating engine to its collaborators: the match data
//! provider used by rebuilds, the snapshot file and the metrics collector.
//!
//! Rebuilds are gather-then-apply. Every record is fetched before the engine
//! is touched, and any fetch failure aborts the rebuild with the store left
//! exactly as it was.

use crate::config::AppConfig;
use crate::engine::{ImportSummary, RatingEngine};
use crate::error::{classify, RatingError, Result};
use crate::metrics::MetricsCollector;
use crate::provider::{HttpMatchProvider, MatchDataProvider};
use crate::rating::environment::RatingEnvironment;
use crate::rating::sequencer::sequence;
use crate::service::health::HealthCheck;
use crate::snapshot::SnapshotFile;
use crate::types::{
    ApplySummary, BatchPrediction, MatchPrediction, MatchRecord, MatchupRequest, SessionContext,
    SubmittedResult, TeamStanding,
};
use crate::utils::{canonical_event_key, is_event_key, is_season_year};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// What a rebuild should replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildSource {
    /// All matches of one event
    Event(String),
    /// All matches of every event in a season
    Season(i32),
}

impl RebuildSource {
    /// Session context recorded after a successful rebuild from this source
    pub fn context(&self) -> SessionContext {
        match self {
            RebuildSource::Event(event_key) => SessionContext {
                event_key: Some(event_key.clone()),
                year: None,
            },
            RebuildSource::Season(year) => SessionContext {
                event_key: None,
                year: Some(*year),
            },
        }
    }
}

/// Rebuild request as received from clients
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RebuildRequest {
    #[serde(default)]
    pub event_key: Option<String>,
    /// Number or numeric string
    #[serde(default)]
    pub year: Option<Value>,
}

fn parse_year(raw: &str) -> Result<i32> {
    let raw = raw.trim();
    if !is_season_year(raw) {
        return Err(RatingError::validation(format!("Invalid year: {}", raw)).into());
    }
    raw.parse()
        .map_err(|_| RatingError::validation(format!("Invalid year: {}", raw)).into())
}

impl RebuildRequest {
    /// Validate the request into exactly one rebuild source
    ///
    /// A bare four-digit event key is taken as a season.
    pub fn into_source(self) -> Result<RebuildSource> {
        let event_key = self
            .event_key
            .map(|k| canonical_event_key(&k))
            .filter(|k| !k.is_empty());
        let year = match self.year {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(other) => {
                return Err(RatingError::validation(format!("Invalid year: {}", other)).into())
            }
        };

        match (event_key, year) {
            (Some(_), Some(_)) | (None, None) => {
                Err(RatingError::validation("Provide either 'event_key' or 'year'").into())
            }
            (Some(key), None) if is_season_year(&key) => Ok(RebuildSource::Season(parse_year(&key)?)),
            (Some(key), None) if is_event_key(&key) => Ok(RebuildSource::Event(key)),
            (Some(key), None) => {
                Err(RatingError::validation(format!("Invalid event key: {}", key)).into())
            }
            (None, Some(year)) => Ok(RebuildSource::Season(parse_year(&year)?)),
        }
    }
}

/// Result of a successful rebuild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildOutcome {
    pub event_key: Option<String>,
    pub year: Option<i32>,
    pub teams_indexed: usize,
    pub events_processed: usize,
    pub matches_seen: usize,
    pub applied: usize,
    pub skipped: usize,
}

/// Where `recalculate` takes its beliefs from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecalculateSource {
    #[default]
    Memory,
    #[serde(alias = "json")]
    File,
}

/// Result of writing the snapshot file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub file: PathBuf,
    pub teams_indexed: usize,
}

/// Result of loading a snapshot file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub file: PathBuf,
    pub use_env_from_snapshot: bool,
    pub teams_indexed: usize,
    pub skipped: usize,
    pub env_applied: bool,
    pub context: SessionContext,
}

/// Result of a recalculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalculateOutcome {
    pub source: RecalculateSource,
    pub file: PathBuf,
    pub teams_indexed: usize,
    pub saved_teams_indexed: usize,
    pub env: RatingEnvironment,
    pub context: SessionContext,
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Rating engine shared by every request
    engine: Arc<RatingEngine>,

    /// Source of match records for rebuilds
    provider: Arc<dyn MatchDataProvider>,

    /// Metrics collector
    metrics: Arc<MetricsCollector>,

    /// Default snapshot location
    snapshot_file: SnapshotFile,

    /// Serialises snapshot file access
    persistence: Mutex<()>,
}

impl AppState {
    /// Build the application with the HTTP match provider
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let provider = Arc::new(HttpMatchProvider::new(&config.provider)?);
        let metrics = Arc::new(MetricsCollector::new()?);
        Self::new(config, provider, metrics)
    }

    /// Build the application with explicit collaborators
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn MatchDataProvider>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self> {
        info!("Initializing {} rating service", config.service.name);

        let env = config.rating.to_environment()?;
        let engine = Arc::new(RatingEngine::new(env)?);
        let snapshot_file = SnapshotFile::new(config.storage.data_path.clone());

        info!(
            "Match provider: {}, snapshot file: {}",
            provider.name(),
            snapshot_file.path().display()
        );

        Ok(Self {
            config,
            engine,
            provider,
            metrics,
            snapshot_file,
            persistence: Mutex::new(()),
        })
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get the rating engine
    pub fn engine(&self) -> Arc<RatingEngine> {
        self.engine.clone()
    }

    /// Get the metrics collector
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Import the configured snapshot if it exists
    ///
    /// Returns `None` when loading is disabled or no snapshot is present.
    pub async fn load_on_startup(&self) -> Result<Option<LoadOutcome>> {
        if !self.config.storage.load_on_startup {
            return Ok(None);
        }
        match self
            .load(None, self.config.storage.use_env_from_snapshot)
            .await
        {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) if matches!(classify(&e), Some(RatingError::SnapshotNotFound { .. })) => {
                info!(
                    "No snapshot at {}, starting with empty ratings",
                    self.snapshot_file.path().display()
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Gather every record for `source`; nothing is applied here
    async fn gather(&self, source: &RebuildSource) -> Result<(Vec<MatchRecord>, usize)> {
        match source {
            RebuildSource::Event(event_key) => {
                let records = self
                    .provider
                    .event_matches(event_key)
                    .await
                    .with_context(|| format!("fetching matches for event {}", event_key))?;
                Ok((records, 1))
            }
            RebuildSource::Season(year) => {
                let event_keys = self
                    .provider
                    .season_events(*year)
                    .await
                    .with_context(|| format!("fetching events for {}", year))?;

                let mut records = Vec::new();
                let mut events_processed = 0;
                for event_key in event_keys.iter().filter(|k| !k.trim().is_empty()) {
                    let event_records = self
                        .provider
                        .event_matches(event_key)
                        .await
                        .with_context(|| format!("fetching matches for event {}", event_key))?;
                    debug!("Gathered {} records from {}", event_records.len(), event_key);
                    records.extend(event_records);
                    events_processed += 1;
                }
                Ok((records, events_processed))
            }
        }
    }

    /// Replace all beliefs with a replay of `source`
    pub async fn rebuild(&self, source: RebuildSource) -> Result<RebuildOutcome> {
        info!("Rebuilding ratings from {:?}", source);

        let fetch_timer = self.metrics.start_timer();
        let gathered = self.gather(&source).await;
        let fetch_duration = fetch_timer.stop();

        let (records, events_processed) = match gathered {
            Ok(gathered) => gathered,
            Err(e) => {
                error!("Rebuild aborted, ratings left unchanged: {:#}", e);
                self.metrics.record_rebuild(false, fetch_duration);
                return Err(e);
            }
        };

        let sequenced = sequence(&records);
        let apply_timer = self.metrics.start_timer();
        let summary = match self.engine.rebuild_sequenced(&sequenced, source.context()) {
            Ok(summary) => summary,
            Err(e) => {
                self.metrics.record_rebuild(false, fetch_duration);
                return Err(e);
            }
        };
        self.metrics.record_batch(&summary, apply_timer.stop());
        self.metrics.record_rebuild(true, fetch_duration);

        let context = source.context();
        Ok(RebuildOutcome {
            event_key: context.event_key,
            year: context.year,
            teams_indexed: summary.teams_indexed,
            events_processed,
            matches_seen: sequenced.seen(),
            applied: summary.applied,
            skipped: summary.skipped,
        })
    }

    /// Apply client-submitted results on top of the current beliefs
    pub fn push_results(&self, submitted: Vec<SubmittedResult>) -> Result<ApplySummary> {
        let records: Vec<MatchRecord> = submitted.into_iter().map(MatchRecord::from).collect();

        let timer = self.metrics.start_timer();
        let summary = self.engine.push_incremental(&records)?;
        self.metrics.record_batch(&summary, timer.stop());
        Ok(summary)
    }

    /// Presentation view of one team
    pub fn team(&self, team_key: &str) -> Result<TeamStanding> {
        self.engine.team_view(team_key)
    }

    /// Win probabilities for one matchup
    pub fn predict_match(&self, alliance_a: &[String], alliance_b: &[String]) -> Result<MatchPrediction> {
        let prediction = self.engine.predict(alliance_a, alliance_b)?;
        self.metrics.record_predictions(1);
        self.metrics.set_teams_indexed(self.engine.team_count()?);
        Ok(prediction)
    }

    /// Win probabilities for several matchups
    pub fn predict_batch(&self, requests: &[MatchupRequest]) -> Result<Vec<BatchPrediction>> {
        let results = self.engine.predict_batch(requests);
        let answered = results.iter().filter(|r| r.prediction.is_some()).count();
        self.metrics.record_predictions(answered);
        self.metrics.set_teams_indexed(self.engine.team_count()?);
        Ok(results)
    }

    /// All teams ordered by conservative estimate
    pub fn leaderboard(&self) -> Result<Vec<TeamStanding>> {
        self.engine.leaderboard()
    }

    /// Write the current state to the snapshot file
    pub async fn save(&self) -> Result<SaveOutcome> {
        let _guard = self.persistence.lock().await;
        self.save_locked()
    }

    fn save_locked(&self) -> Result<SaveOutcome> {
        let result = self
            .engine
            .export_snapshot()
            .and_then(|snapshot| self.snapshot_file.save(&snapshot).map(|_| snapshot));
        self.metrics.record_snapshot_operation("save", result.is_ok());

        let snapshot = result.inspect_err(|e| warn!("Failed to save snapshot: {:#}", e))?;
        info!(
            "Saved {} teams to {}",
            snapshot.teams.len(),
            self.snapshot_file.path().display()
        );
        Ok(SaveOutcome {
            file: self.snapshot_file.path().to_path_buf(),
            teams_indexed: snapshot.teams.len(),
        })
    }

    /// Import a snapshot file, by default the configured one
    pub async fn load(&self, path: Option<PathBuf>, use_env_from_snapshot: bool) -> Result<LoadOutcome> {
        let _guard = self.persistence.lock().await;
        let file = path
            .map(|path| SnapshotFile::new(path))
            .unwrap_or_else(|| self.snapshot_file.clone());
        let summary = self.load_locked(&file, use_env_from_snapshot)?;

        Ok(LoadOutcome {
            file: file.path().to_path_buf(),
            use_env_from_snapshot,
            teams_indexed: summary.teams_indexed,
            skipped: summary.skipped,
            env_applied: summary.env_applied,
            context: self.engine.context()?,
        })
    }

    fn load_locked(&self, file: &SnapshotFile, use_env_from_snapshot: bool) -> Result<ImportSummary> {
        let result = file
            .load()
            .and_then(|decoded| self.engine.import_snapshot(decoded, use_env_from_snapshot));
        self.metrics.record_snapshot_operation("load", result.is_ok());

        let summary = result.inspect_err(|e| warn!("Failed to load snapshot: {:#}", e))?;
        self.metrics.set_teams_indexed(summary.teams_indexed);
        Ok(summary)
    }

    /// Refresh derived fields by re-exporting, optionally reloading from file first
    pub async fn recalculate(&self, source: RecalculateSource) -> Result<RecalculateOutcome> {
        let _guard = self.persistence.lock().await;

        let teams_indexed = match source {
            RecalculateSource::File => self.load_locked(&self.snapshot_file, false)?.teams_indexed,
            RecalculateSource::Memory => self.engine.team_count()?,
        };
        let saved = self.save_locked()?;
        self.metrics.record_snapshot_operation("recalculate", true);

        Ok(RecalculateOutcome {
            source,
            file: saved.file,
            teams_indexed,
            saved_teams_indexed: saved.teams_indexed,
            env: self.engine.environment()?,
            context: self.engine.context()?,
        })
    }

    /// Liveness report
    pub fn health(&self) -> HealthCheck {
        HealthCheck::check(&self.config.service.name, &self.engine)
    }
}

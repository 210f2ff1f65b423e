//! Snapshot wire format
//!
//! `RatingSnapshot` is the exported representation and the persisted contract.
//! Imports go through `SnapshotImport`, a lenient decoded form that tolerates
//! missing sections, numeric strings and malformed team entries, so one bad
//! row never fails a whole load.

use crate::error::{RatingError, Result};
use crate::rating::confidence::standing;
use crate::rating::environment::{floor_sigma, RatingEnvironment};
use crate::types::{SessionContext, TeamBelief, TeamKey, TeamStanding};
use crate::utils::{canonical_team_key, current_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default provenance string written into exported snapshots
pub const DEFAULT_SOURCE: &str = "The Blue Alliance (processed locally)";

/// Session context as it appears on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotContext {
    pub event_key: Option<String>,
    pub year: Option<i32>,
    pub teams_indexed: usize,
}

/// Snapshot metadata block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub env: RatingEnvironment,
    pub context: SnapshotContext,
}

/// Persisted representation of the whole engine state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub meta: SnapshotMeta,
    /// Sorted by team key
    pub teams: Vec<TeamStanding>,
}

impl RatingSnapshot {
    /// Build a snapshot from store entries, which must already be sorted by key
    pub fn capture(
        env: &RatingEnvironment,
        entries: Vec<(TeamKey, TeamBelief)>,
        context: &SessionContext,
        source: impl Into<String>,
    ) -> Self {
        let teams: Vec<TeamStanding> = entries
            .into_iter()
            .map(|(team_key, belief)| standing(team_key, belief, env))
            .collect();

        RatingSnapshot {
            meta: SnapshotMeta {
                generated_at: current_timestamp(),
                source: source.into(),
                env: *env,
                context: SnapshotContext {
                    event_key: context.event_key.clone(),
                    year: context.year,
                    teams_indexed: teams.len(),
                },
            },
            teams,
        }
    }

    /// Pretty-printed JSON document
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            RatingError::Internal {
                message: format!("Failed to serialize snapshot: {}", e),
            }
            .into()
        })
    }
}

/// Environment fields found in a snapshot; any of them may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvFields {
    pub mu: Option<f64>,
    pub sigma: Option<f64>,
    pub beta: Option<f64>,
    pub tau: Option<f64>,
    pub draw_probability: Option<f64>,
}

impl EnvFields {
    /// Fill gaps from `current` and validate the result
    pub fn resolve(&self, current: &RatingEnvironment) -> Result<RatingEnvironment> {
        RatingEnvironment::new(
            self.mu.unwrap_or(current.mu),
            self.sigma.unwrap_or(current.sigma),
            self.beta.unwrap_or(current.beta),
            self.tau.unwrap_or(current.tau),
            self.draw_probability.unwrap_or(current.draw_probability),
        )
    }
}

impl From<&RatingEnvironment> for EnvFields {
    fn from(env: &RatingEnvironment) -> Self {
        EnvFields {
            mu: Some(env.mu),
            sigma: Some(env.sigma),
            beta: Some(env.beta),
            tau: Some(env.tau),
            draw_probability: Some(env.draw_probability),
        }
    }
}

/// Decoded snapshot ready to be applied to an engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotImport {
    pub env: EnvFields,
    pub context: SessionContext,
    pub entries: Vec<(TeamKey, TeamBelief)>,
    /// Team entries dropped for a missing key, mu or sigma
    pub skipped: usize,
}

impl From<RatingSnapshot> for SnapshotImport {
    fn from(snapshot: RatingSnapshot) -> Self {
        SnapshotImport {
            env: EnvFields::from(&snapshot.meta.env),
            context: SessionContext {
                event_key: snapshot.meta.context.event_key,
                year: snapshot.meta.context.year,
            },
            entries: snapshot
                .teams
                .into_iter()
                .map(|team| {
                    (
                        canonical_team_key(&team.team_key),
                        TeamBelief::new(team.mu, floor_sigma(team.sigma)),
                    )
                })
                .collect(),
            skipped: 0,
        }
    }
}

/// Number, or string holding a number
fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_year(value: Option<&Value>) -> Option<i32> {
    match value? {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => s.parse().ok(),
        _ => None,
    }
}

fn decode_team(entry: &Value) -> Option<(TeamKey, TeamBelief)> {
    let key = match entry.get("team_key")? {
        Value::String(s) => canonical_team_key(s),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if key.is_empty() {
        return None;
    }
    let mu = lenient_f64(entry.get("mu"))?;
    let sigma = lenient_f64(entry.get("sigma"))?;
    if !mu.is_finite() || !sigma.is_finite() || sigma < 0.0 {
        return None;
    }
    // Zero or tiny deviations are clamped, not rejected
    Some((key, TeamBelief::new(mu, floor_sigma(sigma))))
}

impl SnapshotImport {
    /// Decode a snapshot document
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| RatingError::SnapshotParse {
            reason: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    /// Decode an already parsed snapshot document
    pub fn from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(RatingError::SnapshotParse {
                reason: "snapshot root must be an object".to_string(),
            }
            .into());
        }

        let meta = value.get("meta").filter(|m| m.is_object());
        let env = meta.and_then(|m| m.get("env")).filter(|e| e.is_object());
        let context = meta.and_then(|m| m.get("context")).filter(|c| c.is_object());

        let env = env
            .map(|e| EnvFields {
                mu: lenient_f64(e.get("mu")),
                sigma: lenient_f64(e.get("sigma")),
                beta: lenient_f64(e.get("beta")),
                tau: lenient_f64(e.get("tau")),
                draw_probability: lenient_f64(e.get("draw_probability")),
            })
            .unwrap_or_default();

        let context = SessionContext {
            event_key: context
                .and_then(|c| c.get("event_key"))
                .and_then(Value::as_str)
                .map(str::to_string),
            year: lenient_year(context.and_then(|c| c.get("year"))),
        };

        let teams = match value.get("teams") {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(teams)) => teams.as_slice(),
            Some(_) => {
                return Err(RatingError::SnapshotParse {
                    reason: "`teams` must be an array".to_string(),
                }
                .into())
            }
        };

        let mut entries = Vec::with_capacity(teams.len());
        let mut skipped = 0;
        for entry in teams {
            match decode_team(entry) {
                Some(decoded) => entries.push(decoded),
                None => skipped += 1,
            }
        }

        Ok(SnapshotImport {
            env,
            context,
            entries,
            skipped,
        })
    }
}

//! Validation and deterministic ordering of raw match records
//!
//! The sequencer is the only producer of input for the update algorithm.
//! Invalid records are counted and dropped; the rest are stably sorted by
//! `(timestamp, phase rank, set, match)` so that replaying the same input
//! always yields the same application order.

use crate::types::{MatchOutcome, MatchRecord, MatchResult, ValidatedMatch, UNRANKED_PHASE};
use crate::utils::canonical_team_key;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Why a record was excluded from the applied set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyAlliance,
    MissingScore,
    UnplayedScore,
    EmptyTeamKey,
    DuplicateTeam,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::EmptyAlliance => "alliance is empty",
            SkipReason::MissingScore => "score is missing",
            SkipReason::UnplayedScore => "score marks an unplayed match",
            SkipReason::EmptyTeamKey => "team key is blank",
            SkipReason::DuplicateTeam => "team appears more than once",
        };
        f.write_str(reason)
    }
}

/// Ordered, validated matches plus the count of dropped records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequencedMatches {
    pub matches: Vec<ValidatedMatch>,
    pub skipped: usize,
}

impl SequencedMatches {
    /// Number of records that were inspected
    pub fn seen(&self) -> usize {
        self.matches.len() + self.skipped
    }
}

fn canonical_alliance(raw: &[String]) -> Result<Vec<String>, SkipReason> {
    if raw.is_empty() {
        return Err(SkipReason::EmptyAlliance);
    }
    raw.iter()
        .map(|key| {
            let key = canonical_team_key(key);
            if key.is_empty() {
                Err(SkipReason::EmptyTeamKey)
            } else {
                Ok(key)
            }
        })
        .collect()
}

fn outcome_from_scores(score_a: Option<f64>, score_b: Option<f64>) -> Result<MatchOutcome, SkipReason> {
    let (score_a, score_b) = match (score_a, score_b) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(SkipReason::MissingScore),
    };
    if score_a.is_nan() || score_b.is_nan() {
        return Err(SkipReason::MissingScore);
    }
    if score_a < 0.0 || score_b < 0.0 {
        return Err(SkipReason::UnplayedScore);
    }

    Ok(if score_a > score_b {
        MatchOutcome::AllianceAWins
    } else if score_b > score_a {
        MatchOutcome::AllianceBWins
    } else {
        MatchOutcome::Draw
    })
}

/// Validate a single record and canonicalise its team keys
pub fn validate_record(record: &MatchRecord) -> Result<ValidatedMatch, SkipReason> {
    let alliance_a = canonical_alliance(&record.alliance_a)?;
    let alliance_b = canonical_alliance(&record.alliance_b)?;

    let mut seen = HashSet::with_capacity(alliance_a.len() + alliance_b.len());
    if !alliance_a.iter().chain(alliance_b.iter()).all(|key| seen.insert(key.as_str())) {
        return Err(SkipReason::DuplicateTeam);
    }

    let outcome = match record.result {
        MatchResult::Scores { score_a, score_b } => outcome_from_scores(score_a, score_b)?,
        MatchResult::Draw => MatchOutcome::Draw,
    };

    Ok(ValidatedMatch {
        alliance_a,
        alliance_b,
        outcome,
    })
}

/// Composite ordering key for a record
fn sort_key(record: &MatchRecord) -> (i64, u8, u32, u32) {
    (
        record.timestamp.unwrap_or(0),
        record.comp_level.map(|level| level.rank()).unwrap_or(UNRANKED_PHASE),
        record.set_number.unwrap_or(0),
        record.match_number.unwrap_or(0),
    )
}

/// Filter invalid records and order the rest for application
pub fn sequence(records: &[MatchRecord]) -> SequencedMatches {
    let mut ordered: Vec<&MatchRecord> = records.iter().collect();
    // `sort_by_key` is stable, so ties keep their input order
    ordered.sort_by_key(|record| sort_key(record));

    let mut sequenced = SequencedMatches::default();
    for record in ordered {
        match validate_record(record) {
            Ok(validated) => sequenced.matches.push(validated),
            Err(reason) => {
                debug!(
                    "Skipping match record {:?} vs {:?}: {}",
                    record.alliance_a, record.alliance_b, reason
                );
                sequenced.skipped += 1;
            }
        }
    }
    sequenced
}

//! Common types used throughout the rating service

use serde::{Deserialize, Serialize};

/// Canonical team identifier (trimmed, lowercase), e.g. `frc254`
pub type TeamKey = String;

/// Ordered list of team keys competing as one composite side
pub type Alliance = Vec<TeamKey>;

/// Gaussian skill belief for a single team
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamBelief {
    pub mu: f64,
    pub sigma: f64,
}

impl TeamBelief {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }

    pub fn variance(&self) -> f64 {
        self.sigma * self.sigma
    }

    /// Lower confidence bound used for ranking
    pub fn conservative(&self) -> f64 {
        self.mu - 3.0 * self.sigma
    }
}

/// Competition phase of a match, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompLevel {
    Practice,
    Qualification,
    EliminationRound1,
    Quarterfinal,
    Semifinal,
    Final,
}

/// Rank assigned to matches whose phase is missing or unrecognised
pub const UNRANKED_PHASE: u8 = 9;

impl CompLevel {
    /// Sort rank of the phase; lower ranks are applied first
    pub fn rank(self) -> u8 {
        match self {
            CompLevel::Practice => 0,
            CompLevel::Qualification => 1,
            CompLevel::EliminationRound1 => 2,
            CompLevel::Quarterfinal => 3,
            CompLevel::Semifinal => 4,
            CompLevel::Final => 5,
        }
    }

    /// Parse a Blue Alliance `comp_level` code (`pr`, `qm`, `ef`, `qf`, `sf`, `f`)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "pr" => Some(CompLevel::Practice),
            "qm" => Some(CompLevel::Qualification),
            "ef" => Some(CompLevel::EliminationRound1),
            "qf" => Some(CompLevel::Quarterfinal),
            "sf" => Some(CompLevel::Semifinal),
            "f" => Some(CompLevel::Final),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            CompLevel::Practice => "pr",
            CompLevel::Qualification => "qm",
            CompLevel::EliminationRound1 => "ef",
            CompLevel::Quarterfinal => "qf",
            CompLevel::Semifinal => "sf",
            CompLevel::Final => "f",
        }
    }
}

impl std::fmt::Display for CompLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Reported result of a match, as supplied by the caller or provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResult {
    /// Final scores; `None` or a negative value means the match was not played
    Scores {
        score_a: Option<f64>,
        score_b: Option<f64>,
    },
    /// Explicit draw with no scores attached
    Draw,
}

/// Raw match record before validation and ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub alliance_a: Alliance,
    pub alliance_b: Alliance,
    pub result: MatchResult,
    /// Unix seconds; missing timestamps sort as zero
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub comp_level: Option<CompLevel>,
    #[serde(default)]
    pub set_number: Option<u32>,
    #[serde(default)]
    pub match_number: Option<u32>,
    #[serde(default)]
    pub event_key: Option<String>,
}

impl MatchRecord {
    /// Create a scored record with no ordering metadata
    pub fn scored<A, B>(alliance_a: A, alliance_b: B, score_a: f64, score_b: f64) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            alliance_a: alliance_a.into_iter().map(Into::into).collect(),
            alliance_b: alliance_b.into_iter().map(Into::into).collect(),
            result: MatchResult::Scores {
                score_a: Some(score_a),
                score_b: Some(score_b),
            },
            timestamp: None,
            comp_level: None,
            set_number: None,
            match_number: None,
            event_key: None,
        }
    }

    /// Create an explicit draw record
    pub fn draw<A, B>(alliance_a: A, alliance_b: B) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            result: MatchResult::Draw,
            ..Self::scored(alliance_a, alliance_b, 0.0, 0.0)
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_phase(mut self, comp_level: CompLevel, set_number: u32, match_number: u32) -> Self {
        self.comp_level = Some(comp_level);
        self.set_number = Some(set_number);
        self.match_number = Some(match_number);
        self
    }

    pub fn with_event(mut self, event_key: impl Into<String>) -> Self {
        self.event_key = Some(event_key.into());
        self
    }
}

/// Client-submitted match result in the `push_results` shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmittedResult {
    #[serde(default)]
    pub teams1: Alliance,
    #[serde(default)]
    pub teams2: Alliance,
    #[serde(default)]
    pub score1: Option<f64>,
    #[serde(default)]
    pub score2: Option<f64>,
}

impl From<SubmittedResult> for MatchRecord {
    fn from(submitted: SubmittedResult) -> Self {
        MatchRecord {
            alliance_a: submitted.teams1,
            alliance_b: submitted.teams2,
            result: MatchResult::Scores {
                score_a: submitted.score1,
                score_b: submitted.score2,
            },
            timestamp: None,
            comp_level: None,
            set_number: None,
            match_number: None,
            event_key: None,
        }
    }
}

/// Outcome of a validated match from alliance A's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    AllianceAWins,
    AllianceBWins,
    Draw,
}

/// A match that passed validation, with canonical team keys
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMatch {
    pub alliance_a: Alliance,
    pub alliance_b: Alliance,
    pub outcome: MatchOutcome,
}

/// Tally returned by every batch that applies matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub applied: usize,
    pub skipped: usize,
    pub teams_indexed: usize,
}

/// Where the current beliefs came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub event_key: Option<String>,
    pub year: Option<i32>,
}

/// Presentation view of one team's belief
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team_key: TeamKey,
    pub mu: f64,
    pub sigma: f64,
    pub conservative_mu_3sigma: f64,
    pub confidence_percent: f64,
}

/// Win probabilities for a hypothetical matchup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchPrediction {
    pub win_probability_a: f64,
    pub win_probability_b: f64,
    /// `|2·pA − 1| · 100`; how decisive the prediction is, not a calibration
    pub prediction_confidence_percent: f64,
}

/// One requested matchup in a batch prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupRequest {
    #[serde(default)]
    pub alliance_a: Alliance,
    #[serde(default)]
    pub alliance_b: Alliance,
}

/// One answered matchup in a batch prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPrediction {
    pub alliance_a: Alliance,
    pub alliance_b: Alliance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<MatchPrediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

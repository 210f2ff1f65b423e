//! Rating system using a two-alliance TrueSkill update
//!
//! This module provides the model parameters, belief storage, match
//! sequencing, the update algorithm, and the win probability estimator.

pub mod calculator;
pub mod confidence;
pub mod environment;
pub mod gaussian;
pub mod sequencer;
pub mod storage;
pub mod trueskill;

// Re-export commonly used types
pub use calculator::{RatingCalculationResult, RatingCalculator};
pub use confidence::{prediction_confidence, team_confidence};
pub use environment::{RatingEnvironment, MIN_SIGMA};
pub use sequencer::{sequence, SequencedMatches, SkipReason};
pub use storage::{InMemoryRatingStore, RatingStore};
pub use trueskill::TrueSkillCalculator;

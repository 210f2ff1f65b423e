//! Rating calculator trait
//!
//! This module defines the interface between the engine and the rating
//! algorithm, so the store and sequencing logic stay independent of the
//! particular update rule.

use crate::rating::environment::RatingEnvironment;
use crate::types::{MatchOutcome, TeamBelief};
use serde::{Deserialize, Serialize};

/// Result of rating one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingCalculationResult {
    /// New beliefs for alliance A, in roster order
    pub alliance_a: Vec<TeamBelief>,
    /// New beliefs for alliance B, in roster order
    pub alliance_b: Vec<TeamBelief>,
}

/// Trait for calculating rating changes after matches
pub trait RatingCalculator: Send + Sync {
    /// Compute new beliefs for both alliances after one match
    ///
    /// # Arguments
    /// * `env` - Active model parameters
    /// * `alliance_a` / `alliance_b` - Current beliefs of each roster, non-empty
    /// * `outcome` - Result from alliance A's point of view
    fn rate_match(
        &self,
        env: &RatingEnvironment,
        alliance_a: &[TeamBelief],
        alliance_b: &[TeamBelief],
        outcome: MatchOutcome,
    ) -> crate::error::Result<RatingCalculationResult>;

    /// Probability that alliance A beats alliance B
    fn win_probability(
        &self,
        env: &RatingEnvironment,
        alliance_a: &[TeamBelief],
        alliance_b: &[TeamBelief],
    ) -> f64;

    /// Short identifier for logs and snapshot metadata
    fn name(&self) -> &'static str;
}

//! Global model parameters for the rating system
//!
//! A `RatingEnvironment` is an immutable value. Changing parameters means
//! building a new environment and swapping it in; existing beliefs are never
//! rescaled when that happens.

use crate::error::{RatingError, Result};
use crate::types::TeamBelief;
use serde::{Deserialize, Serialize};

/// Lower bound for any belief's standard deviation
pub const MIN_SIGMA: f64 = 1e-4;

/// Model parameters shared by every belief in a store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingEnvironment {
    /// Prior mean for a team seen for the first time
    pub mu: f64,
    /// Prior standard deviation for a team seen for the first time
    pub sigma: f64,
    /// Per-team performance noise scale
    pub beta: f64,
    /// Dynamics noise added to each updated team's deviation
    pub tau: f64,
    /// Probability of a draw, in `[0, 1)`
    pub draw_probability: f64,
}

impl Default for RatingEnvironment {
    fn default() -> Self {
        let mu = 25.0;
        let sigma = mu / 3.0;
        Self {
            mu,
            sigma,
            beta: sigma / 2.0,
            tau: sigma / 100.0,
            draw_probability: 0.0,
        }
    }
}

impl RatingEnvironment {
    /// Create a validated environment
    pub fn new(mu: f64, sigma: f64, beta: f64, tau: f64, draw_probability: f64) -> Result<Self> {
        let env = Self {
            mu,
            sigma,
            beta,
            tau,
            draw_probability,
        };
        env.validate()?;
        Ok(env)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.mu.is_finite() {
            return Err(RatingError::Configuration {
                message: "Prior mu must be finite".to_string(),
            }
            .into());
        }

        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(RatingError::Configuration {
                message: "Prior sigma must be positive".to_string(),
            }
            .into());
        }

        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(RatingError::Configuration {
                message: "Beta must be non-negative".to_string(),
            }
            .into());
        }

        if !self.tau.is_finite() || self.tau < 0.0 {
            return Err(RatingError::Configuration {
                message: "Tau must be non-negative".to_string(),
            }
            .into());
        }

        if !(0.0..1.0).contains(&self.draw_probability) {
            return Err(RatingError::Configuration {
                message: "Draw probability must be in [0, 1)".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Belief assigned to a team on first reference
    pub fn prior(&self) -> TeamBelief {
        TeamBelief::new(self.mu, self.sigma)
    }
}

/// Clamp a deviation to the positive floor
pub fn floor_sigma(sigma: f64) -> f64 {
    if sigma.is_finite() {
        sigma.max(MIN_SIGMA)
    } else {
        MIN_SIGMA
    }
}

/// Clamp a variance to the square of the deviation floor
pub fn floor_variance(variance: f64) -> f64 {
    let min = MIN_SIGMA * MIN_SIGMA;
    if variance.is_finite() {
        variance.max(min)
    } else {
        min
    }
}

//! Rating system configuration

use crate::rating::environment::RatingEnvironment;
use serde::{Deserialize, Serialize};

/// Model parameters as they appear in config files and environment variables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub mu: f64,
    pub sigma: f64,
    pub beta: f64,
    pub tau: f64,
    pub draw_probability: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        let env = RatingEnvironment::default();
        Self {
            mu: env.mu,
            sigma: env.sigma,
            beta: env.beta,
            tau: env.tau,
            draw_probability: env.draw_probability,
        }
    }
}

impl RatingConfig {
    /// Build and validate the environment described by this config
    pub fn to_environment(&self) -> crate::error::Result<RatingEnvironment> {
        RatingEnvironment::new(self.mu, self.sigma, self.beta, self.tau, self.draw_probability)
    }
}

//! Confidence metrics derived from beliefs and predictions
//!
//! Neither value is a calibrated probability. Team confidence measures how much
//! of the prior uncertainty has been removed; prediction confidence measures
//! how far a win probability sits from a coin flip.

use crate::rating::environment::RatingEnvironment;
use crate::types::{TeamBelief, TeamKey, TeamStanding};
use crate::utils::round_to;

/// `100 · clamp(1 − (σ/σ0)², 0, 1)`
pub fn team_confidence(sigma: f64, prior_sigma: f64) -> f64 {
    if prior_sigma <= 0.0 || !prior_sigma.is_finite() {
        return 0.0;
    }
    let ratio = sigma / prior_sigma;
    let remaining = 1.0 - ratio * ratio;
    if remaining.is_nan() {
        return 0.0;
    }
    100.0 * remaining.clamp(0.0, 1.0)
}

/// `|2·p − 1| · 100`
pub fn prediction_confidence(win_probability: f64) -> f64 {
    ((2.0 * win_probability - 1.0).abs() * 100.0).clamp(0.0, 100.0)
}

/// Presentation view of a belief with derived fields
pub fn standing(team_key: TeamKey, belief: TeamBelief, env: &RatingEnvironment) -> TeamStanding {
    TeamStanding {
        team_key,
        mu: belief.mu,
        sigma: belief.sigma,
        conservative_mu_3sigma: belief.conservative(),
        confidence_percent: round_to(team_confidence(belief.sigma, env.sigma), 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_confidence_bounds() {
        assert_eq!(team_confidence(25.0 / 3.0, 25.0 / 3.0), 0.0);
        assert_eq!(team_confidence(0.0, 25.0 / 3.0), 100.0);
        // Dynamics noise can push sigma above the prior
        assert_eq!(team_confidence(9.0, 25.0 / 3.0), 0.0);
        assert!((team_confidence(5.0, 10.0) - 75.0).abs() < 1e-12);
    }

    #[test]
    fn test_team_confidence_degenerate_prior() {
        assert_eq!(team_confidence(1.0, 0.0), 0.0);
        assert_eq!(team_confidence(f64::NAN, 8.0), 0.0);
    }

    #[test]
    fn test_prediction_confidence() {
        assert_eq!(prediction_confidence(0.5), 0.0);
        assert!((prediction_confidence(0.75) - 50.0).abs() < 1e-12);
        assert!((prediction_confidence(0.25) - 50.0).abs() < 1e-12);
        assert_eq!(prediction_confidence(1.0), 100.0);
    }

    #[test]
    fn test_standing_fields() {
        let env = RatingEnvironment::default();
        let view = standing("frc254".to_string(), TeamBelief::new(30.0, 2.0), &env);

        assert_eq!(view.team_key, "frc254");
        assert_eq!(view.conservative_mu_3sigma, 24.0);
        assert_eq!(view.confidence_percent, 94.24);
    }
}

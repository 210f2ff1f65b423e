//! Two-alliance TrueSkill update and win probability estimator
//!
//! Each alliance is treated as one composite competitor whose mean is the sum
//! of its members' means and whose variance is the sum of their variances.
//! A match result is folded in with exact moment matching on the performance
//! difference, and the correction is shared out to members in proportion to
//! their own variance.

use crate::error::RatingError;
use crate::rating::calculator::{RatingCalculationResult, RatingCalculator};
use crate::rating::environment::{floor_sigma, floor_variance, RatingEnvironment};
use crate::rating::gaussian::{self, cdf};
use crate::types::{MatchOutcome, TeamBelief};

/// TrueSkill rating calculator for two alliances
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueSkillCalculator;

impl TrueSkillCalculator {
    pub fn new() -> Self {
        Self
    }
}

/// Sum of means and floored variances over an alliance
fn composite(alliance: &[TeamBelief]) -> (f64, f64) {
    alliance.iter().fold((0.0, 0.0), |(mu, var), belief| {
        let sigma = floor_sigma(belief.sigma);
        (mu + belief.mu, var + sigma * sigma)
    })
}

/// Posterior beliefs after observing `outcome`, before dynamics noise
///
/// Variances only shrink here; callers add `tau²` afterwards.
pub fn moment_match(
    env: &RatingEnvironment,
    alliance_a: &[TeamBelief],
    alliance_b: &[TeamBelief],
    outcome: MatchOutcome,
) -> (Vec<TeamBelief>, Vec<TeamBelief>) {
    let (mu_a, var_a) = composite(alliance_a);
    let (mu_b, var_b) = composite(alliance_b);

    let total_teams = alliance_a.len() + alliance_b.len();
    let c_squared = var_a + var_b + total_teams as f64 * env.beta * env.beta;
    let c = c_squared.sqrt();
    let epsilon = gaussian::draw_margin(env.draw_probability, total_teams, env.beta) / c;

    // Equal scores always take the draw branch, even when the configured draw
    // probability is zero and the margin collapses to a point.
    let (v, w, sign_a) = match outcome {
        MatchOutcome::AllianceAWins => {
            let t = (mu_a - mu_b) / c;
            (gaussian::v_win(t, epsilon), gaussian::w_win(t, epsilon), 1.0)
        }
        MatchOutcome::AllianceBWins => {
            let t = (mu_b - mu_a) / c;
            (gaussian::v_win(t, epsilon), gaussian::w_win(t, epsilon), -1.0)
        }
        MatchOutcome::Draw => {
            let t = (mu_a - mu_b) / c;
            (gaussian::v_draw(t, epsilon), gaussian::w_draw(t, epsilon), 1.0)
        }
    };

    let correct = |belief: &TeamBelief, sign: f64| {
        let sigma = floor_sigma(belief.sigma);
        let variance = sigma * sigma;
        let mu = belief.mu + sign * (variance / c) * v;
        let variance = floor_variance(variance * (1.0 - (variance / c_squared) * w));
        TeamBelief::new(mu, variance.sqrt())
    };

    let new_a = alliance_a.iter().map(|b| correct(b, sign_a)).collect();
    let new_b = alliance_b.iter().map(|b| correct(b, -sign_a)).collect();
    (new_a, new_b)
}

/// Add per-update dynamics noise to a posterior belief
pub fn apply_dynamics(env: &RatingEnvironment, belief: TeamBelief) -> TeamBelief {
    let variance = floor_variance(belief.variance() + env.tau * env.tau);
    TeamBelief::new(belief.mu, variance.sqrt())
}

/// Full update for one match: moment matching followed by dynamics noise
pub fn rate_alliances(
    env: &RatingEnvironment,
    alliance_a: &[TeamBelief],
    alliance_b: &[TeamBelief],
    outcome: MatchOutcome,
) -> (Vec<TeamBelief>, Vec<TeamBelief>) {
    let (post_a, post_b) = moment_match(env, alliance_a, alliance_b, outcome);
    (
        post_a.into_iter().map(|b| apply_dynamics(env, b)).collect(),
        post_b.into_iter().map(|b| apply_dynamics(env, b)).collect(),
    )
}

/// Probability that alliance A outperforms alliance B
///
/// Ignores the draw probability. Returns 0.5 when the total deviation is zero.
pub fn win_probability(
    env: &RatingEnvironment,
    alliance_a: &[TeamBelief],
    alliance_b: &[TeamBelief],
) -> f64 {
    let mu_a: f64 = alliance_a.iter().map(|b| b.mu).sum();
    let mu_b: f64 = alliance_b.iter().map(|b| b.mu).sum();
    let sigma_sq_sum: f64 = alliance_a
        .iter()
        .chain(alliance_b.iter())
        .map(TeamBelief::variance)
        .sum();
    let total_teams = (alliance_a.len() + alliance_b.len()) as f64;

    let denom = (total_teams * env.beta * env.beta + sigma_sq_sum).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.5;
    }
    cdf((mu_a - mu_b) / denom)
}

impl RatingCalculator for TrueSkillCalculator {
    fn rate_match(
        &self,
        env: &RatingEnvironment,
        alliance_a: &[TeamBelief],
        alliance_b: &[TeamBelief],
        outcome: MatchOutcome,
    ) -> crate::error::Result<RatingCalculationResult> {
        if alliance_a.is_empty() || alliance_b.is_empty() {
            return Err(RatingError::validation("Both alliances must contain at least one team").into());
        }

        let (alliance_a, alliance_b) = rate_alliances(env, alliance_a, alliance_b, outcome);

        Ok(RatingCalculationResult {
            alliance_a,
            alliance_b,
        })
    }

    fn win_probability(
        &self,
        env: &RatingEnvironment,
        alliance_a: &[TeamBelief],
        alliance_b: &[TeamBelief],
    ) -> f64 {
        win_probability(env, alliance_a, alliance_b)
    }

    fn name(&self) -> &'static str {
        "trueskill"
    }
}

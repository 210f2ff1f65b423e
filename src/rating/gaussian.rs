//! Standard normal helpers and truncated-Gaussian moment functions
//!
//! `v_*` give the mean shift and `w_*` the variance reduction factor of a
//! standard normal truncated by a win (`x > ε`) or draw (`|x| ≤ ε`) observation.
//! Both are evaluated on the performance gap divided by the total performance
//! deviation `c`.

use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{PI, SQRT_2};

/// Below this the truncation mass is treated as zero and the asymptotic limits are used
const MIN_TRUNCATION_MASS: f64 = 2.222_758_749e-162;

/// Standard normal density
pub fn pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Standard normal cumulative distribution
pub fn cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Inverse of the standard normal cumulative distribution
pub fn ppf(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Draw margin in performance units for a given draw probability
pub fn draw_margin(draw_probability: f64, total_teams: usize, beta: f64) -> f64 {
    if draw_probability <= 0.0 {
        return 0.0;
    }
    ppf((draw_probability + 1.0) / 2.0) * (total_teams as f64).sqrt() * beta
}

/// Mean correction for a decisive result
pub fn v_win(t: f64, epsilon: f64) -> f64 {
    let x = t - epsilon;
    let denom = cdf(x);
    if denom < MIN_TRUNCATION_MASS {
        -x
    } else {
        pdf(x) / denom
    }
}

/// Variance correction for a decisive result, in `[0, 1]`
pub fn w_win(t: f64, epsilon: f64) -> f64 {
    let x = t - epsilon;
    let denom = cdf(x);
    if denom < MIN_TRUNCATION_MASS {
        return if x < 0.0 { 1.0 } else { 0.0 };
    }
    let v = v_win(t, epsilon);
    (v * (v + x)).clamp(0.0, 1.0)
}

/// Mean correction for a draw; the sign follows `t`
pub fn v_draw(t: f64, epsilon: f64) -> f64 {
    let abs_t = t.abs();
    let a = epsilon - abs_t;
    let b = -epsilon - abs_t;
    let denom = cdf(a) - cdf(b);
    let v = if denom < MIN_TRUNCATION_MASS {
        a
    } else {
        (pdf(b) - pdf(a)) / denom
    };
    if t < 0.0 {
        -v
    } else {
        v
    }
}

/// Variance correction for a draw, in `[0, 1]`
///
/// With a zero margin the truncation collapses to a point and the factor is 1.
pub fn w_draw(t: f64, epsilon: f64) -> f64 {
    let abs_t = t.abs();
    let a = epsilon - abs_t;
    let b = -epsilon - abs_t;
    let denom = cdf(a) - cdf(b);
    if denom < MIN_TRUNCATION_MASS {
        return 1.0;
    }
    let v = v_draw(abs_t, epsilon);
    (v * v + (a * pdf(a) - b * pdf(b)) / denom).clamp(0.0, 1.0)
}

//! Population statistics and Elo arithmetic.
//!
//! Standard deviation is the population form (N denominator).

use serde::{Deserialize, Serialize};

/// Starting rating for a player whose score is exactly 50.
pub const BASE_ELO: f64 = 1000.0;

/// Default Elo K-factor.
pub const DEFAULT_K_FACTOR: f64 = 32.0;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation; 0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    let Some(mu) = mean(values) else {
        return 0.0;
    };
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Standard deviation divided by mean, as a ratio.
///
/// Degenerate populations (empty, a single value, or a zero mean) report 0.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    match mean(values) {
        Some(mu) if mu != 0.0 => std_dev(values) / mu.abs(),
        _ => 0.0,
    }
}

/// Linear-interpolated percentile, `p` in [0, 100].
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Elo rating a player starts from when it only has a pointwise score.
pub fn elo_from_score(score: f64) -> f64 {
    BASE_ELO + (score - 50.0)
}

/// Probability that a player rated `rating` beats one rated `opponent`.
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / 400.0))
}

/// New `(winner, loser)` ratings after a decisive match.
pub fn calculate_new_elo(winner_elo: f64, loser_elo: f64, k: f64) -> (f64, f64) {
    rate_match(winner_elo, loser_elo, 1.0, k)
}

/// New ratings for a drawn match scored as half a point each.
pub fn calculate_draw_elo(a_elo: f64, b_elo: f64, k: f64) -> (f64, f64) {
    rate_match(a_elo, b_elo, 0.5, k)
}

fn rate_match(a: f64, b: f64, a_score: f64, k: f64) -> (f64, f64) {
    let expected_a = expected_score(a, b);
    let expected_b = 1.0 - expected_a;
    (
        a + k * (a_score - expected_a),
        b + k * ((1.0 - a_score) - expected_b),
    )
}

/// Summary of eligible scores, surfaced in the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
    pub p50: Option<f64>,
    pub p90: Option<f64>,
}

impl ScoreSummary {
    pub fn from_scores(values: &[f64]) -> Self {
        Self {
            count: values.len(),
            mean: mean(values),
            std_dev: std_dev(values),
            coefficient_of_variation: coefficient_of_variation(values),
            p50: percentile(values, 50.0),
            p90: percentile(values, 90.0),
        }
    }
}

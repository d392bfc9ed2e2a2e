//! Outlier elimination on pointwise scores.

use tracing::debug;

use crate::stats::coefficient_of_variation;

use super::player::ELIMINATED_TOO_LOW_SCORE;
use super::registry::Registry;

/// Drop the lowest-scoring eligible player while the coefficient of
/// variation (in percent) of eligible scores is at or above
/// `threshold_percent`.
///
/// Stops once fewer than two scored players remain, so at most n-1 players
/// are removed. Ties on the lowest score remove the later input first.
/// Unscored players are ignored. Returns eliminated ids in removal order.
pub fn eliminate_outliers(registry: &mut Registry, threshold_percent: f64) -> Vec<String> {
    let mut eliminated = Vec::new();
    loop {
        let scored: Vec<(usize, f64)> = registry
            .eligible()
            .filter_map(|p| p.score.map(|s| (p.index, s)))
            .collect();
        if scored.len() < 2 {
            break;
        }

        let scores: Vec<f64> = scored.iter().map(|&(_, s)| s).collect();
        let variation = coefficient_of_variation(&scores) * 100.0;
        if variation < threshold_percent {
            break;
        }

        let Some(&(lowest, score)) = scored
            .iter()
            .reduce(|best, candidate| if candidate.1 <= best.1 { candidate } else { best })
        else {
            break;
        };

        let player = registry.player_mut(lowest);
        player.eliminated = Some(ELIMINATED_TOO_LOW_SCORE.to_string());
        debug!(player = %player.id, score, variation, "eliminated outlier");
        eliminated.push(player.id.clone());
    }
    eliminated
}

//! Adaptive Elo matchmaking.
//!
//! Each round sorts eligible players by current rating and pairs sorted
//! neighbours, so players meet opponents of similar strength. The pairing
//! offset alternates between rounds so neighbours change; anyone left over
//! plays their nearest neighbour. Ratings update after each match, in
//! pairing order, and the next round pairs on the updated ratings.

use std::collections::HashSet;

use futures::{stream, StreamExt, TryStreamExt};
use tracing::debug;

use crate::judge::PairwiseJudge;
use crate::stats::{calculate_draw_elo, calculate_new_elo, BASE_ELO};

use super::error::LeaderboardError;
use super::options::{EloDrawPolicy, LeaderboardOptions};
use super::pairwise::{judge_pair, Judgment, MatchOutcome};
use super::registry::Registry;
use super::trace::{TraceSink, TraceStage};

/// Pairs for one round, as `(index, index)` with the higher-rated player
/// first.
///
/// `ratings` holds `(index, elo)`; ties in rating keep ascending index order.
/// Every entry appears in at least one pair when there are two or more.
pub fn pair_round(ratings: &[(usize, f64)], round: usize) -> Vec<(usize, usize)> {
    let mut ranked = ratings.to_vec();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let n = ranked.len();
    if n < 2 {
        return Vec::new();
    }

    let offset = if n > 2 { round % 2 } else { 0 };
    let mut paired = vec![false; n];
    let mut positions: Vec<(usize, usize)> = Vec::with_capacity(n / 2 + 2);

    let mut pos = offset;
    while pos + 1 < n {
        positions.push((pos, pos + 1));
        paired[pos] = true;
        paired[pos + 1] = true;
        pos += 2;
    }

    for pos in 0..n {
        if paired[pos] {
            continue;
        }
        let partner = if pos + 1 < n { pos + 1 } else { pos - 1 };
        positions.push((pos.min(partner), pos.max(partner)));
    }

    let mut seen = HashSet::new();
    positions
        .into_iter()
        .filter(|pair| seen.insert(*pair))
        .map(|(x, y)| (ranked[x].0, ranked[y].0))
        .collect()
}

/// Run `options.matches_per_player` rounds of Elo matches. Returns the
/// number of matches played.
pub async fn run_elo(
    registry: &mut Registry,
    criterion: &str,
    judge: &dyn PairwiseJudge,
    options: &LeaderboardOptions,
    trace: Option<&dyn TraceSink>,
) -> Result<usize, LeaderboardError> {
    let eligible = registry.eligible_indices();
    for &index in &eligible {
        let player = registry.player_mut(index);
        if player.ensure_elo().is_none() {
            player.elo = Some(BASE_ELO);
        }
    }

    let k = options.elo_k_factor;
    let mut sequence = 0usize;
    for round in 0..options.matches_per_player {
        let ratings: Vec<(usize, f64)> = eligible
            .iter()
            .map(|&i| (i, registry.player(i).elo.unwrap_or(BASE_ELO)))
            .collect();
        let pairs = pair_round(&ratings, round);

        let roster = &*registry;
        let judgments: Vec<Judgment> = stream::iter(pairs.iter().map(|&(a, b)| {
            judge_pair(
                judge,
                criterion,
                TraceStage::Elo,
                roster.player(a),
                roster.player(b),
            )
        }))
        .buffered(options.judge_concurrency.max(1))
        .try_collect()
        .await?;

        for judgment in &judgments {
            let (a, b) = (judgment.player_a, judgment.player_b);
            let before = [
                registry.player(a).elo.unwrap_or(BASE_ELO),
                registry.player(b).elo.unwrap_or(BASE_ELO),
            ];
            let after = match (judgment.outcome, options.elo_draw_policy) {
                (MatchOutcome::Decisive { winner, .. }, _) if winner == a => {
                    let (w, l) = calculate_new_elo(before[0], before[1], k);
                    [w, l]
                }
                (MatchOutcome::Decisive { .. }, _) => {
                    let (w, l) = calculate_new_elo(before[1], before[0], k);
                    [l, w]
                }
                (MatchOutcome::Draw, EloDrawPolicy::NoChange) => before,
                (MatchOutcome::Draw, EloDrawPolicy::HalfPoint) => {
                    let (x, y) = calculate_draw_elo(before[0], before[1], k);
                    [x, y]
                }
            };

            for (index, elo) in [(a, after[0]), (b, after[1])] {
                let player = registry.player_mut(index);
                player.elo = Some(elo);
                player.elo_matches += 1;
            }

            let (pa, pb) = (registry.player(a), registry.player(b));
            debug!(
                round,
                player_a = %pa.id,
                player_b = %pb.id,
                label = %judgment.label,
                elo_a = after[0],
                elo_b = after[1],
                "elo match"
            );
            if let Some(trace) = trace {
                let mut event = judgment.trace(TraceStage::Elo, sequence, pa, pb);
                event.round = Some(round);
                event.elo_before = Some(before);
                event.elo_after = Some(after);
                trace.record(event)?;
            }
            sequence += 1;
        }
    }

    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ratings(n: usize) -> Vec<(usize, f64)> {
        (0..n).map(|i| (i, 1000.0 + (i * 7 % 13) as f64)).collect()
    }

    #[test]
    fn every_player_plays_each_round() {
        for n in 2..20 {
            for round in 0..4 {
                let pairs = pair_round(&ratings(n), round);
                let mut seen = vec![false; n];
                for &(a, b) in &pairs {
                    assert_ne!(a, b);
                    seen[a] = true;
                    seen[b] = true;
                }
                assert!(seen.iter().all(|&s| s), "n={n} round={round}");
            }
        }
    }

    #[test]
    fn pairs_are_unique_within_a_round() {
        for n in 2..20 {
            let pairs = pair_round(&ratings(n), 1);
            let unique: HashSet<(usize, usize)> =
                pairs.iter().map(|&(a, b)| (a.min(b), a.max(b))).collect();
            assert_eq!(unique.len(), pairs.len());
        }
    }

    #[test]
    fn neighbours_by_rating_are_paired() {
        let ratings = vec![(0, 900.0), (1, 1200.0), (2, 1100.0), (3, 1000.0)];
        assert_eq!(pair_round(&ratings, 0), vec![(1, 2), (3, 0)]);
        // Offset round: middle pair, then each end plays its neighbour.
        assert_eq!(pair_round(&ratings, 1), vec![(2, 3), (1, 2), (3, 0)]);
    }

    #[test]
    fn rating_ties_follow_input_order() {
        let ratings = vec![(2, 1000.0), (0, 1000.0), (1, 1000.0)];
        assert_eq!(pair_round(&ratings, 0), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn rounds_accumulate_matches() {
        let n = 15;
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for round in 0..3 {
            for (a, b) in pair_round(&ratings(n), round) {
                *counts.entry(a).or_default() += 1;
                *counts.entry(b).or_default() += 1;
            }
        }
        assert_eq!(counts.len(), n);
        assert!(counts.values().all(|&c| c >= 3));
    }

    #[test]
    fn small_populations() {
        assert!(pair_round(&[], 0).is_empty());
        assert!(pair_round(&[(0, 1000.0)], 0).is_empty());
        assert_eq!(pair_round(&[(0, 1000.0), (1, 1010.0)], 1), vec![(1, 0)]);
    }
}

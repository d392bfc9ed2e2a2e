//! Round-robin league among eligible players.

use futures::{stream, StreamExt, TryStreamExt};
use tracing::debug;

use crate::judge::PairwiseJudge;

use super::error::LeaderboardError;
use super::pairwise::{judge_pair, Judgment, MatchOutcome};
use super::registry::Registry;
use super::trace::{TraceSink, TraceStage};

/// Every unordered pair of `players` once, lower input position first.
pub fn round_robin_pairs(players: &[usize]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::with_capacity(players.len() * players.len().saturating_sub(1) / 2);
    for (i, &a) in players.iter().enumerate() {
        for &b in &players[i + 1..] {
            pairs.push((a, b));
        }
    }
    pairs
}

/// Play the full round robin and tally wins, losses and draws.
///
/// Verdicts are fetched with at most `concurrency` calls in flight; tallies
/// are applied afterwards in pair order. Returns the number of matches.
pub async fn run_league(
    registry: &mut Registry,
    criterion: &str,
    judge: &dyn PairwiseJudge,
    concurrency: usize,
    trace: Option<&dyn TraceSink>,
) -> Result<usize, LeaderboardError> {
    let pairs = round_robin_pairs(&registry.eligible_indices());
    if pairs.is_empty() {
        return Ok(0);
    }

    let roster = &*registry;
    let judgments: Vec<Judgment> = stream::iter(pairs.iter().map(|&(a, b)| {
        judge_pair(
            judge,
            criterion,
            TraceStage::League,
            roster.player(a),
            roster.player(b),
        )
    }))
    .buffered(concurrency.max(1))
    .try_collect()
    .await?;

    for (sequence, judgment) in judgments.iter().enumerate() {
        match judgment.outcome {
            MatchOutcome::Decisive { winner, loser } => {
                registry.player_mut(winner).league.win += 1;
                registry.player_mut(loser).league.lose += 1;
            }
            MatchOutcome::Draw => {
                registry.player_mut(judgment.player_a).league.draw += 1;
                registry.player_mut(judgment.player_b).league.draw += 1;
            }
        }
        let a = registry.player(judgment.player_a);
        let b = registry.player(judgment.player_b);
        debug!(sequence, player_a = %a.id, player_b = %b.id, label = %judgment.label, "league match");
        if let Some(trace) = trace {
            trace.record(judgment.trace(TraceStage::League, sequence, a, b))?;
        }
    }

    Ok(judgments.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn round_robin_covers_each_pair_once() {
        for n in 0..12usize {
            let players: Vec<usize> = (0..n).map(|i| i * 2).collect();
            let pairs = round_robin_pairs(&players);
            assert_eq!(pairs.len(), n * n.saturating_sub(1) / 2);
            let unique: HashSet<(usize, usize)> = pairs
                .iter()
                .map(|&(a, b)| (a.min(b), a.max(b)))
                .collect();
            assert_eq!(unique.len(), pairs.len());
            assert!(pairs.iter().all(|&(a, b)| a < b));
        }
    }
}

//! Pointwise scoring stage.

use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::judge::{Persona, PointwiseJudge};

use super::error::LeaderboardError;
use super::registry::Registry;
use super::trace::{MatchTrace, TraceSink};

/// Score every eligible player that has no score yet.
///
/// Judge calls run concurrently, at most `concurrency` in flight; results are
/// written back in input order once all of them succeed. Returns the number
/// of players scored.
pub async fn score_players(
    registry: &mut Registry,
    criterion: &str,
    personas: &[Persona],
    judge: &dyn PointwiseJudge,
    concurrency: usize,
    trace: Option<&dyn TraceSink>,
) -> Result<usize, LeaderboardError> {
    let pending: Vec<(usize, &str, &str)> = registry
        .eligible()
        .filter(|p| p.score.is_none())
        .map(|p| (p.index, p.id.as_str(), p.content.as_str()))
        .collect();

    let scores: Vec<(usize, f64)> = stream::iter(pending.into_iter().map(
        |(index, id, content)| async move {
            judge
                .score(content, criterion, personas)
                .await
                .map(|score| (index, score))
                .map_err(|source| LeaderboardError::Scoring {
                    player_id: id.to_string(),
                    source,
                })
        },
    ))
    .buffered(concurrency.max(1))
    .try_collect()
    .await?;

    for (sequence, &(index, raw)) in scores.iter().enumerate() {
        let player = registry.player_mut(index);
        if !raw.is_finite() {
            return Err(LeaderboardError::MalformedScore {
                player_id: player.id.clone(),
                score: raw,
            });
        }
        let score = raw.clamp(0.0, 100.0);
        if score != raw {
            warn!(player = %player.id, raw, "score outside 0-100, clamped");
        }
        player.score = Some(score);
        debug!(player = %player.id, score, "scored");
        if let Some(trace) = trace {
            trace.record(MatchTrace::pointwise(sequence, &player.id, score))?;
        }
    }

    Ok(scores.len())
}

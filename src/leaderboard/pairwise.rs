//! Maps a judge's winner label back onto player identities.

use tracing::warn;

use crate::judge::{PairwiseJudge, WinnerLabel};

use super::error::LeaderboardError;
use super::player::Player;
use super::trace::{MatchTrace, TraceStage};

/// Result of one pairwise match, by registry position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Decisive { winner: usize, loser: usize },
    Draw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    pub player_a: usize,
    pub player_b: usize,
    pub outcome: MatchOutcome,
    /// Label as the judge returned it.
    pub label: String,
    pub rationale: Option<String>,
}

impl Judgment {
    pub(crate) fn trace(
        &self,
        stage: TraceStage,
        sequence: usize,
        a: &Player,
        b: &Player,
    ) -> MatchTrace {
        let mut event = MatchTrace::pairwise(stage, sequence, &a.id, &b.id);
        event.label = Some(self.label.clone());
        event.rationale = self.rationale.clone();
        match self.outcome {
            MatchOutcome::Decisive { winner, .. } => {
                let winner = if winner == a.index { a } else { b };
                event.winner_id = Some(winner.id.clone());
            }
            MatchOutcome::Draw => event.draw = true,
        }
        event
    }
}

/// Ask `judge` to compare `a` (shown first) with `b`.
///
/// Unrecognized labels are logged and scored as a draw; judge failures are
/// returned with both player ids attached.
pub async fn judge_pair(
    judge: &dyn PairwiseJudge,
    criterion: &str,
    stage: TraceStage,
    a: &Player,
    b: &Player,
) -> Result<Judgment, LeaderboardError> {
    let verdict = judge
        .compare(&a.content, &b.content, criterion)
        .await
        .map_err(|source| LeaderboardError::Match {
            stage,
            player_a_id: a.id.clone(),
            player_b_id: b.id.clone(),
            source,
        })?;

    let outcome = match &verdict.winner {
        WinnerLabel::A => MatchOutcome::Decisive {
            winner: a.index,
            loser: b.index,
        },
        WinnerLabel::B => MatchOutcome::Decisive {
            winner: b.index,
            loser: a.index,
        },
        WinnerLabel::Draw => MatchOutcome::Draw,
        WinnerLabel::Unrecognized(raw) => {
            warn!(
                stage = ?stage,
                player_a = %a.id,
                player_b = %b.id,
                label = %raw,
                "unrecognized winner label, scoring as draw"
            );
            MatchOutcome::Draw
        }
    };

    Ok(Judgment {
        player_a: a.index,
        player_b: b.index,
        outcome,
        label: verdict.winner.as_str().to_string(),
        rationale: verdict.rationale,
    })
}

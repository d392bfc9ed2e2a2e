use crate::judge::JudgeError;

use super::registry::RegistryError;
use super::trace::{TraceError, TraceStage};

/// Every failure that aborts a leaderboard run. No partial leaderboard is
/// produced once one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("persona recommendation failed: {0}")]
    Personas(#[source] JudgeError),

    #[error("scoring player {player_id} failed: {source}")]
    Scoring {
        player_id: String,
        #[source]
        source: JudgeError,
    },

    #[error("judge returned a non-finite score ({score}) for player {player_id}")]
    MalformedScore { player_id: String, score: f64 },

    #[error("{stage:?} match {player_a_id} vs {player_b_id} failed: {source}")]
    Match {
        stage: TraceStage,
        player_a_id: String,
        player_b_id: String,
        #[source]
        source: JudgeError,
    },

    #[error("trace error: {0}")]
    Trace(#[from] TraceError),
}

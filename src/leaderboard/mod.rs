//! Leaderboard pipeline.
//!
//! [`run_leaderboard`] takes caller players and a criterion through
//! pointwise scoring, outlier elimination, Elo matchmaking and a round-robin
//! league, and returns a totally ordered [`LeaderboardReport`].

pub mod elo;
pub mod error;
pub mod league;
pub mod options;
pub mod outlier;
pub mod pairwise;
pub mod player;
pub mod registry;
pub mod report;
pub mod run;
pub mod scoring;
pub mod trace;

pub use error::LeaderboardError;
pub use options::{EloDrawPolicy, LeaderboardOptions, MAX_JUDGE_CONCURRENCY};
pub use pairwise::{judge_pair, Judgment, MatchOutcome};
pub use player::{LeagueRecord, Player, PlayerInput, PlayerRecord, ELIMINATED_TOO_LOW_SCORE};
pub use registry::{Registry, RegistryError};
pub use report::{
    compare_players, rank_players, render_report_markdown, LeaderboardReport, PlayerReport,
    ReportMeta, Stage,
};
pub use run::{
    run_leaderboard, run_leaderboard_with_trace, validate_leaderboard_request, Judges,
    LeaderboardRequest,
};
pub use trace::{
    JsonlTraceSink, MatchTrace, MemoryTraceSink, TraceError, TraceSink, TraceStage, TraceWorker,
};

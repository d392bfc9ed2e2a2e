#![forbid(unsafe_code)]

//! # cardinal-league
//!
//! LLM-judged leaderboards for free-text candidates.
//!
//! Each player is first scored once against a natural-language criterion by a
//! panel of recommended reviewer personas. Low-scoring outliers are trimmed
//! until the score spread is tight. Large fields then play adaptive Elo
//! rounds against similarly rated opponents, and the survivors finish with a
//! full round-robin league. The result is a deterministic, totally ordered
//! [`LeaderboardReport`].
//!
//! The pipeline only sees the judge traits in [`judge`]; [`judge::LlmJudge`]
//! implements them over an OpenRouter [`gateway`], with an optional SQLite
//! [`cache`] of pairwise verdicts.

pub mod cache;
pub mod gateway;
pub mod judge;
pub mod leaderboard;
pub mod prompts;
pub mod stats;

pub use cache::{CacheError, SqliteVerdictCache, VerdictCache, VerdictCacheKey};
pub use gateway::{Attribution, ChatGateway, ChatModel, GatewayConfig, ProviderError, ProviderGateway};
pub use judge::{
    JudgeError, JudgeVerdict, LlmJudge, PairwiseJudge, Persona, PersonaRecommender,
    PointwiseJudge, WinnerLabel,
};
pub use leaderboard::{
    render_report_markdown, run_leaderboard, run_leaderboard_with_trace, EloDrawPolicy,
    JsonlTraceSink, Judges, LeaderboardError, LeaderboardOptions, LeaderboardReport,
    LeaderboardRequest, MatchTrace, MemoryTraceSink, PlayerInput, PlayerRecord, PlayerReport,
    TraceError, TraceSink, TraceStage, TraceWorker,
};

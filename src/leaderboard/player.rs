//! Players and their ranking state.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::stats::elo_from_score;

/// Elimination tag set by the outlier eliminator.
pub const ELIMINATED_TOO_LOW_SCORE: &str = "too_low_score";

/// Round-robin tallies. Counters only ever increase within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueRecord {
    #[serde(default)]
    pub win: u32,
    #[serde(default)]
    pub lose: u32,
    #[serde(default)]
    pub draw: u32,
}

impl LeagueRecord {
    /// Three points for a win, one for a draw.
    pub fn score(&self) -> u32 {
        self.win * 3 + self.draw
    }

    pub fn played(&self) -> u32 {
        self.win + self.lose + self.draw
    }
}

/// Caller input for one player: bare content or a full record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerInput {
    Content(String),
    Record(PlayerRecord),
}

impl From<&str> for PlayerInput {
    fn from(content: &str) -> Self {
        PlayerInput::Content(content.to_string())
    }
}

impl From<String> for PlayerInput {
    fn from(content: String) -> Self {
        PlayerInput::Content(content)
    }
}

impl From<PlayerRecord> for PlayerInput {
    fn from(record: PlayerRecord) -> Self {
        PlayerInput::Record(record)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Generated (UUID v4 from the run's RNG) when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    /// A pre-scored player is not sent to the pointwise judge.
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub elo: Option<f64>,
    #[serde(default)]
    pub league: LeagueRecord,
    /// A pre-eliminated player stays eliminated.
    #[serde(default)]
    pub eliminated: Option<String>,
}

impl PlayerRecord {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_elo(mut self, elo: f64) -> Self {
        self.elo = Some(elo);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: String,
    pub content: String,
    pub score: Option<f64>,
    pub elo: Option<f64>,
    pub league: LeagueRecord,
    pub eliminated: Option<String>,
    /// Elo-stage matches played this run.
    pub elo_matches: u32,
    /// Position in the caller's input; the final tie-breaker.
    pub index: usize,
}

impl Player {
    /// Missing ids become UUID v4 values drawn from `rng`, so a seeded run
    /// reproduces them.
    pub(crate) fn from_input<R: Rng + ?Sized>(
        input: PlayerInput,
        index: usize,
        rng: &mut R,
    ) -> Self {
        let record = match input {
            PlayerInput::Content(content) => PlayerRecord {
                content,
                ..Default::default()
            },
            PlayerInput::Record(record) => record,
        };
        Self {
            id: record.id.unwrap_or_else(|| {
                uuid::Builder::from_random_bytes(rng.gen())
                    .into_uuid()
                    .to_string()
            }),
            content: record.content,
            score: record.score,
            elo: record.elo,
            league: record.league,
            eliminated: record.eliminated,
            elo_matches: 0,
            index,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.eliminated.is_none()
    }

    /// Elo supplied by the caller or pinned by the Elo stage. Ranking uses
    /// only this.
    pub fn rated_elo(&self) -> Option<f64> {
        self.elo
    }

    /// Explicit Elo, else the rating derived from `score`.
    pub fn current_elo(&self) -> Option<f64> {
        self.elo.or_else(|| self.score.map(elo_from_score))
    }

    /// Pin the derived rating so later updates start from it.
    pub(crate) fn ensure_elo(&mut self) -> Option<f64> {
        if self.elo.is_none() {
            self.elo = self.score.map(elo_from_score);
        }
        self.elo
    }

    pub fn league_score(&self) -> u32 {
        self.league.score()
    }
}

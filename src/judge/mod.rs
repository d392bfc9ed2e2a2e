//! Judge seams used by the leaderboard pipeline.
//!
//! The pipeline never talks to a model directly: it sees only these three
//! traits. [`LlmJudge`] implements all of them over the chat gateway; tests
//! substitute deterministic stubs.

mod llm;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::CacheError;
use crate::gateway::ProviderError;

pub use llm::{
    parse_pairwise_response, parse_personas_response, parse_score_response, LlmJudge,
    DEFAULT_MODEL,
};

/// A reviewer role used to frame pointwise scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Render personas as a bullet list for the scoring prompt.
pub fn format_personas(personas: &[Persona]) -> String {
    if personas.is_empty() {
        return "- Generalist: reads carefully and judges only the stated criterion".to_string();
    }
    personas
        .iter()
        .map(|p| {
            if p.description.is_empty() {
                format!("- {}", p.name)
            } else {
                format!("- {}: {}", p.name, p.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Winner label as returned by a pairwise judge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinnerLabel {
    A,
    B,
    Draw,
    /// Anything else. The adapter scores it as a draw.
    Unrecognized(String),
}

impl WinnerLabel {
    /// Lenient parse: case, surrounding quotes/punctuation and the common
    /// spellings (`a`, `player_a`, `Player A`, `tie`, ...) are accepted.
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '`')
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();
        match normalized.as_str() {
            "a" | "player_a" | "playera" | "candidate_a" | "first" => WinnerLabel::A,
            "b" | "player_b" | "playerb" | "candidate_b" | "second" => WinnerLabel::B,
            "draw" | "tie" | "equal" | "none" | "neither" => WinnerLabel::Draw,
            _ => WinnerLabel::Unrecognized(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WinnerLabel::A => "player_a",
            WinnerLabel::B => "player_b",
            WinnerLabel::Draw => "draw",
            WinnerLabel::Unrecognized(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeVerdict {
    pub winner: WinnerLabel,
    pub rationale: Option<String>,
}

impl JudgeVerdict {
    pub fn new(winner: WinnerLabel) -> Self {
        Self {
            winner,
            rationale: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("malformed judge response: {0}")]
    Parse(String),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

#[async_trait]
pub trait PointwiseJudge: Send + Sync {
    /// Absolute score for `content` against `criterion`, nominally 0-100.
    async fn score(
        &self,
        content: &str,
        criterion: &str,
        personas: &[Persona],
    ) -> Result<f64, JudgeError>;
}

#[async_trait]
pub trait PairwiseJudge: Send + Sync {
    async fn compare(
        &self,
        content_a: &str,
        content_b: &str,
        criterion: &str,
    ) -> Result<JudgeVerdict, JudgeError>;
}

#[async_trait]
pub trait PersonaRecommender: Send + Sync {
    /// Three reviewer personas suited to `criterion`, given sample contents.
    async fn recommend(
        &self,
        samples: &[String],
        criterion: &str,
    ) -> Result<Vec<Persona>, JudgeError>;
}

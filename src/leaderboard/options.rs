//! Tunables for a leaderboard run.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Upper bound on in-flight judge calls.
pub const MAX_JUDGE_CONCURRENCY: usize = 64;

/// What a drawn Elo-stage match does to ratings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EloDrawPolicy {
    /// Ratings are left untouched.
    #[default]
    NoChange,
    /// Standard Elo with half a point to each side.
    HalfPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardOptions {
    /// Keep trimming the lowest score while the eligible coefficient of
    /// variation, in percent, is at or above this.
    #[serde(default = "default_score_variation_threshold")]
    pub score_variation_threshold: f64,

    /// The Elo stage runs only when more players than this are eligible.
    #[serde(default = "default_elo_population_threshold")]
    pub elo_population_threshold: usize,

    /// Elo matchmaking rounds; each eligible player plays at least once per round.
    #[serde(default = "default_matches_per_player")]
    pub matches_per_player: usize,

    #[serde(default = "default_elo_k_factor")]
    pub elo_k_factor: f64,

    #[serde(default)]
    pub elo_draw_policy: EloDrawPolicy,

    /// Maximum judge calls in flight at once.
    #[serde(default = "default_judge_concurrency")]
    pub judge_concurrency: usize,

    /// How many player contents the persona recommender sees.
    #[serde(default = "default_persona_sample_size")]
    pub persona_sample_size: usize,

    /// Seed for persona sampling; random when omitted.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_score_variation_threshold() -> f64 {
    10.0
}

fn default_elo_population_threshold() -> usize {
    10
}

fn default_matches_per_player() -> usize {
    3
}

fn default_elo_k_factor() -> f64 {
    crate::stats::DEFAULT_K_FACTOR
}

fn default_judge_concurrency() -> usize {
    8
}

fn default_persona_sample_size() -> usize {
    5
}

impl Default for LeaderboardOptions {
    fn default() -> Self {
        Self {
            score_variation_threshold: default_score_variation_threshold(),
            elo_population_threshold: default_elo_population_threshold(),
            matches_per_player: default_matches_per_player(),
            elo_k_factor: default_elo_k_factor(),
            elo_draw_policy: EloDrawPolicy::default(),
            judge_concurrency: default_judge_concurrency(),
            persona_sample_size: default_persona_sample_size(),
            rng_seed: None,
        }
    }
}

impl LeaderboardOptions {
    /// Load from a `.toml` file, or JSON for any other extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            toml::from_str(&raw).map_err(|e| format!("invalid options TOML: {e}"))
        } else {
            serde_json::from_str(&raw).map_err(|e| format!("invalid options JSON: {e}"))
        }
    }

    /// First problem found, as a human-readable message.
    pub fn validate(&self) -> Result<(), String> {
        if !self.score_variation_threshold.is_finite() || self.score_variation_threshold < 0.0 {
            return Err(format!(
                "score_variation_threshold must be a finite number >= 0 (got {})",
                self.score_variation_threshold
            ));
        }
        if !self.elo_k_factor.is_finite() || self.elo_k_factor < 0.0 {
            return Err(format!(
                "elo_k_factor must be a finite number >= 0 (got {})",
                self.elo_k_factor
            ));
        }
        if self.matches_per_player == 0 {
            return Err("matches_per_player must be >= 1".into());
        }
        if self.judge_concurrency == 0 {
            return Err("judge_concurrency must be >= 1".into());
        }
        if self.judge_concurrency > MAX_JUDGE_CONCURRENCY {
            return Err(format!(
                "judge_concurrency must be <= {MAX_JUDGE_CONCURRENCY}"
            ));
        }
        if self.persona_sample_size == 0 {
            return Err("persona_sample_size must be >= 1".into());
        }
        Ok(())
    }
}

//! Per-run roster of players.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::stats::{coefficient_of_variation, mean, ScoreSummary};

use super::player::{Player, PlayerInput};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate player id: {0}")]
    DuplicateId(String),
}

/// Owns the players of one leaderboard computation, in input order.
#[derive(Debug, Clone)]
pub struct Registry {
    players: Vec<Player>,
}

impl Registry {
    /// Build the roster in input order. Ids missing from the input are drawn
    /// from `rng`.
    pub fn build<R: Rng + ?Sized>(
        inputs: Vec<PlayerInput>,
        rng: &mut R,
    ) -> Result<Self, RegistryError> {
        let players: Vec<Player> = inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| Player::from_input(input, index, &mut *rng))
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        for p in &players {
            if !seen.insert(p.id.as_str()) {
                return Err(RegistryError::DuplicateId(p.id.clone()));
            }
        }
        Ok(Self { players })
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn eligible(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_eligible())
    }

    /// Input positions of eligible players, ascending.
    pub fn eligible_indices(&self) -> Vec<usize> {
        self.eligible().map(|p| p.index).collect()
    }

    pub fn eligible_len(&self) -> usize {
        self.eligible().count()
    }

    pub fn get(&self, index: usize) -> Option<&Player> {
        self.players.get(index)
    }

    pub(crate) fn player(&self, index: usize) -> &Player {
        &self.players[index]
    }

    pub(crate) fn player_mut(&mut self, index: usize) -> &mut Player {
        &mut self.players[index]
    }

    /// Scores of eligible players that have one.
    pub fn eligible_scores(&self) -> Vec<f64> {
        self.eligible().filter_map(|p| p.score).collect()
    }

    pub fn mean_score(&self) -> Option<f64> {
        mean(&self.eligible_scores())
    }

    /// Coefficient of variation of eligible scores, as a ratio.
    pub fn score_variation(&self) -> f64 {
        coefficient_of_variation(&self.eligible_scores())
    }

    pub fn score_summary(&self) -> ScoreSummary {
        ScoreSummary::from_scores(&self.eligible_scores())
    }

    /// Up to `n` contents drawn without replacement.
    pub fn sample_contents<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<String> {
        self.players
            .choose_multiple(rng, n)
            .map(|p| p.content.clone())
            .collect()
    }

    pub fn into_players(self) -> Vec<Player> {
        self.players
    }
}

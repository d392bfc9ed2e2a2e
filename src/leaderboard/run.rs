//! Leaderboard orchestration.
//!
//! Stages, in order: persona recommendation, pointwise scoring, outlier
//! elimination, Elo matchmaking (large populations only), round-robin league,
//! final ordering. Any judge failure aborts the run.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::judge::{PairwiseJudge, Persona, PersonaRecommender, PointwiseJudge};

use super::elo::run_elo;
use super::error::LeaderboardError;
use super::league::run_league;
use super::options::LeaderboardOptions;
use super::outlier::eliminate_outliers;
use super::player::PlayerInput;
use super::registry::Registry;
use super::report::{hash_request, rank_players, LeaderboardReport, ReportMeta, Stage};
use super::scoring::score_players;
use super::trace::TraceSink;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardRequest {
    /// Natural-language evaluation criterion.
    pub criterion: String,
    pub players: Vec<PlayerInput>,
    #[serde(default)]
    pub options: LeaderboardOptions,
}

impl LeaderboardRequest {
    pub fn new(criterion: impl Into<String>, players: Vec<PlayerInput>) -> Self {
        Self {
            criterion: criterion.into(),
            players,
            options: LeaderboardOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LeaderboardOptions) -> Self {
        self.options = options;
        self
    }
}

/// The three judge roles a run needs. One type often plays all of them.
#[derive(Clone, Copy)]
pub struct Judges<'a> {
    pub pointwise: &'a dyn PointwiseJudge,
    pub pairwise: &'a dyn PairwiseJudge,
    pub personas: &'a dyn PersonaRecommender,
}

impl<'a> Judges<'a> {
    pub fn single<J>(judge: &'a J) -> Self
    where
        J: PointwiseJudge + PairwiseJudge + PersonaRecommender,
    {
        Self {
            pointwise: judge,
            pairwise: judge,
            personas: judge,
        }
    }
}

pub fn validate_leaderboard_request(req: &LeaderboardRequest) -> Result<(), LeaderboardError> {
    req.options
        .validate()
        .map_err(LeaderboardError::InvalidOptions)?;
    if req.criterion.trim().is_empty() {
        return Err(LeaderboardError::InvalidRequest(
            "criterion must not be empty".into(),
        ));
    }
    Ok(())
}

/// Rank `req.players` against `req.criterion`.
pub async fn run_leaderboard(
    judges: Judges<'_>,
    req: &LeaderboardRequest,
    run_id: Option<Uuid>,
) -> Result<LeaderboardReport, LeaderboardError> {
    run_leaderboard_with_trace(judges, req, run_id, None).await
}

/// Rank `req.players`, recording every score and match to `trace`.
pub async fn run_leaderboard_with_trace(
    judges: Judges<'_>,
    req: &LeaderboardRequest,
    run_id: Option<Uuid>,
    trace: Option<&dyn TraceSink>,
) -> Result<LeaderboardReport, LeaderboardError> {
    validate_leaderboard_request(req)?;
    let started = Instant::now();
    let run_id = run_id.unwrap_or_else(Uuid::new_v4);
    let options = &req.options;
    let criterion = req.criterion.as_str();

    let mut rng = match options.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut registry = Registry::build(req.players.clone(), &mut rng)?;
    info!(%run_id, players = registry.len(), "leaderboard run started");

    let mut stages = Vec::new();

    let needs_scoring = registry.eligible().any(|p| p.score.is_none());
    let personas: Vec<Persona> = if needs_scoring {
        let samples = registry.sample_contents(options.persona_sample_size, &mut rng);
        let personas = judges
            .personas
            .recommend(&samples, criterion)
            .await
            .map_err(LeaderboardError::Personas)?;
        info!(%run_id, count = personas.len(), "personas selected");
        personas
    } else {
        Vec::new()
    };

    let players_scored = score_players(
        &mut registry,
        criterion,
        &personas,
        judges.pointwise,
        options.judge_concurrency,
        trace,
    )
    .await?;
    stages.push(Stage::Pointwise);
    info!(%run_id, scored = players_scored, "pointwise scoring complete");

    let eliminated = eliminate_outliers(&mut registry, options.score_variation_threshold);
    stages.push(Stage::OutlierElimination);
    info!(
        %run_id,
        eliminated = eliminated.len(),
        remaining = registry.eligible_len(),
        variation_pct = registry.score_variation() * 100.0,
        "outlier elimination complete"
    );

    let mut elo_matches = 0;
    if registry.eligible_len() > options.elo_population_threshold {
        elo_matches = run_elo(&mut registry, criterion, judges.pairwise, options, trace).await?;
        stages.push(Stage::Elo);
        info!(%run_id, matches = elo_matches, "elo stage complete");
    }

    let league_matches = run_league(
        &mut registry,
        criterion,
        judges.pairwise,
        options.judge_concurrency,
        trace,
    )
    .await?;
    stages.push(Stage::League);
    info!(%run_id, matches = league_matches, "league stage complete");

    let score_summary = registry.score_summary();
    let players_total = registry.len();
    let players_eliminated = registry.iter().filter(|p| !p.is_eligible()).count();
    let players = rank_players(registry.into_players());
    let latency_ms = started.elapsed().as_millis();
    info!(%run_id, latency_ms = latency_ms as u64, "leaderboard run finished");

    Ok(LeaderboardReport {
        players,
        meta: ReportMeta {
            run_id: run_id.to_string(),
            request_hash: hash_request(req),
            criterion: req.criterion.clone(),
            stages,
            players_total,
            players_scored,
            players_eliminated,
            elo_matches,
            league_matches,
            score_summary,
            personas,
            latency_ms,
            generated_at: chrono::Utc::now(),
        },
    })
}

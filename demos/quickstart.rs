//! Minimal end-to-end example for `cardinal-league`.
//!
//! Ranks three product taglines by "how memorable the tagline is" and prints
//! the leaderboard.
//!
//! To run:
//! - Set `OPENROUTER_API_KEY`
//! - `cargo run --example quickstart`

use std::sync::Arc;

use cardinal_league::gateway::ChatModel;
use cardinal_league::judge::DEFAULT_MODEL;
use cardinal_league::{
    run_leaderboard, Judges, LeaderboardOptions, LeaderboardRequest, LlmJudge, PlayerInput,
    ProviderGateway, SqliteVerdictCache,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // -- Infrastructure setup ------------------------------------------------

    // Pairwise verdicts are cached in SQLite, so re-running this example only
    // pays for comparisons it has not seen before.
    let cache = SqliteVerdictCache::new(SqliteVerdictCache::default_path())?;

    // OpenRouter gateway; reads OPENROUTER_API_KEY from the environment and
    // retries transient failures with backoff.
    let gateway = ProviderGateway::from_env()?;

    // One LLM judge plays all three roles: persona recommender, pointwise
    // scorer and pairwise judge.
    let judge = LlmJudge::new(Arc::new(gateway), ChatModel::openrouter(DEFAULT_MODEL))
        .with_cache(Arc::new(cache));

    // -- The actual request --------------------------------------------------

    let req = LeaderboardRequest::new(
        "how memorable the tagline is",
        vec![
            PlayerInput::from("Think different."),
            PlayerInput::from("The best a man can get."),
            PlayerInput::from("Quality products at reasonable prices."),
        ],
    )
    .with_options(LeaderboardOptions {
        rng_seed: Some(42), // reproducible persona sampling
        ..Default::default()
    });

    // -- Run it --------------------------------------------------------------

    let report = run_leaderboard(Judges::single(&judge), &req, None).await?;

    // -- Interpret results ---------------------------------------------------

    println!("stages: {:?}", report.meta.stages);
    println!(
        "matches: {} elo, {} league",
        report.meta.elo_matches, report.meta.league_matches
    );
    println!();

    for p in &report.players {
        println!(
            "  #{} {:<45} elo {:>7.1}  W-D-L {}-{}-{}  {}",
            p.rank,
            p.content,
            p.elo.unwrap_or_default(),
            p.league.win,
            p.league.draw,
            p.league.lose,
            p.eliminated.as_deref().unwrap_or(""),
        );
    }

    Ok(())
}

#![forbid(unsafe_code)]

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use cardinal_league::cache::SqliteVerdictCache;
use cardinal_league::gateway::{ChatModel, ProviderGateway};
use cardinal_league::judge::{LlmJudge, DEFAULT_MODEL};
use cardinal_league::leaderboard::{
    render_report_markdown, run_leaderboard_with_trace, JsonlTraceSink, Judges,
    LeaderboardOptions, LeaderboardReport, LeaderboardRequest, TraceSink,
};

#[derive(Parser)]
#[command(name = "cardinal-league", version, about = "LLM-judged leaderboard CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank players from a request JSON (LLM calls)
    Run {
        /// Request JSON: {"criterion", "players", "options"?}
        #[arg(long)]
        request: PathBuf,
        /// Report JSON output
        #[arg(long)]
        out: PathBuf,
        /// Also write a markdown report
        #[arg(long)]
        markdown: Option<PathBuf>,
        /// JSONL trace of every score and match
        #[arg(long)]
        trace: Option<PathBuf>,
        /// SQLite cache for pairwise verdicts
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Options file (JSON or TOML); replaces the request's options
        #[arg(long)]
        options: Option<PathBuf>,
        /// OpenRouter model id (default: $CARDINAL_LEAGUE_MODEL or built-in)
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        rng_seed: Option<u64>,
    },
    /// Render a markdown report from a report JSON
    Render {
        #[arg(long)]
        report: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Prune the verdict cache (by age and/or size)
    CachePrune {
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        max_age_days: Option<u64>,
        #[arg(long)]
        max_rows: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            request,
            out,
            markdown,
            trace,
            cache,
            options,
            model,
            rng_seed,
        } => {
            let mut req: LeaderboardRequest = read_json(&request)?;
            if let Some(path) = options {
                req.options = LeaderboardOptions::from_path(path)?;
            }
            if rng_seed.is_some() {
                req.options.rng_seed = rng_seed;
            }

            let model = model
                .or_else(|| std::env::var("CARDINAL_LEAGUE_MODEL").ok())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string());
            let run_id = Uuid::new_v4();
            let gateway = ProviderGateway::from_env()?;
            let mut judge = LlmJudge::new(Arc::new(gateway), ChatModel::openrouter(model))
                .with_run_id(run_id);
            if let Some(path) = cache {
                judge = judge.with_cache(Arc::new(SqliteVerdictCache::new(path)?));
            }

            let (trace_sink, trace_worker) = if let Some(path) = trace {
                let (sink, worker) = JsonlTraceSink::new(path)?;
                (Some(sink), Some(worker))
            } else {
                (None, None)
            };
            let trace_ref = trace_sink.as_ref().map(|sink| sink as &dyn TraceSink);

            let report =
                run_leaderboard_with_trace(Judges::single(&judge), &req, Some(run_id), trace_ref)
                    .await?;

            drop(trace_sink);
            if let Some(worker) = trace_worker {
                worker.join()?;
            }

            write_json(&out, &report)?;
            if let Some(path) = markdown {
                std::fs::write(path, render_report_markdown(&report, None))?;
            }
        }
        Commands::Render {
            report,
            out,
            top_n,
        } => {
            let report: LeaderboardReport = read_json(&report)?;
            std::fs::write(out, render_report_markdown(&report, top_n))?;
        }
        Commands::CachePrune {
            db,
            max_age_days,
            max_rows,
        } => {
            if max_age_days.is_none() && max_rows.is_none() {
                return Err("cache-prune requires --max-age-days and/or --max-rows".into());
            }
            let path = db.unwrap_or_else(SqliteVerdictCache::default_path);
            let cache = SqliteVerdictCache::new(path)?;
            let stats = cache.prune(max_age_days, max_rows).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &PathBuf,
) -> Result<T, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: serde::Serialize>(path: &PathBuf, value: &T) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, json)
}

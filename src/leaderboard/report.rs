//! Final ordering and report rendering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::judge::Persona;
use crate::stats::ScoreSummary;

use super::player::{LeagueRecord, Player};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerReport {
    /// 1-based position in the leaderboard.
    pub rank: usize,
    pub id: String,
    pub content: String,
    pub score: Option<f64>,
    pub elo: Option<f64>,
    pub eliminated: Option<String>,
    pub league: LeagueRecord,
    pub league_score: u32,
    #[serde(default)]
    pub elo_matches: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pointwise,
    OutlierElimination,
    Elo,
    League,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub run_id: String,
    /// blake3 of the serialized request.
    pub request_hash: String,
    pub criterion: String,
    pub stages: Vec<Stage>,
    pub players_total: usize,
    pub players_scored: usize,
    pub players_eliminated: usize,
    pub elo_matches: usize,
    pub league_matches: usize,
    pub score_summary: ScoreSummary,
    pub personas: Vec<Persona>,
    pub latency_ms: u128,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardReport {
    pub players: Vec<PlayerReport>,
    pub meta: ReportMeta,
}

impl LeaderboardReport {
    /// Lookup by content, for players whose ids were generated.
    pub fn find_by_content(&self, content: &str) -> Option<&PlayerReport> {
        self.players.iter().find(|p| p.content == content)
    }

    pub fn find(&self, id: &str) -> Option<&PlayerReport> {
        self.players.iter().find(|p| p.id == id)
    }
}

/// Present values sort before absent ones; present values descend.
fn desc_present(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Leaderboard order: eligible first, then rated Elo, league score and
/// pointwise score descending, then input order. Total, so the result is
/// deterministic.
///
/// Only a rated Elo (supplied by the caller or earned in the Elo stage)
/// ranks. A rating derived from the score alone does not.
pub fn compare_players(a: &Player, b: &Player) -> Ordering {
    b.is_eligible()
        .cmp(&a.is_eligible())
        .then_with(|| desc_present(a.rated_elo(), b.rated_elo()))
        .then_with(|| b.league_score().cmp(&a.league_score()))
        .then_with(|| desc_present(a.score, b.score))
        .then_with(|| a.index.cmp(&b.index))
}

pub fn rank_players(mut players: Vec<Player>) -> Vec<PlayerReport> {
    players.sort_by(compare_players);
    players
        .into_iter()
        .enumerate()
        .map(|(i, p)| PlayerReport {
            rank: i + 1,
            elo: p.current_elo(),
            league_score: p.league_score(),
            id: p.id,
            content: p.content,
            score: p.score,
            eliminated: p.eliminated,
            league: p.league,
            elo_matches: p.elo_matches,
        })
        .collect()
}

fn opt_num(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{v:.precision$}"))
        .unwrap_or_else(|| "-".to_string())
}

/// Markdown table cells cannot hold newlines or bare pipes.
fn cell(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out: String = flat.chars().take(max_chars).collect();
    if flat.chars().count() > max_chars {
        out.push('…');
    }
    out.replace('|', "\\|")
}

pub fn render_report_markdown(report: &LeaderboardReport, top_n: Option<usize>) -> String {
    let meta = &report.meta;
    let mut out = String::new();
    out.push_str("# Leaderboard\n\n");
    out.push_str(&format!("- Criterion: {}\n", meta.criterion));
    out.push_str(&format!("- Run: `{}`\n", meta.run_id));
    out.push_str(&format!("- Request hash: `{}`\n", meta.request_hash));
    out.push_str(&format!(
        "- Stages: {}\n",
        meta.stages
            .iter()
            .map(|s| format!("{s:?}"))
            .collect::<Vec<_>>()
            .join(" → ")
    ));
    out.push_str(&format!(
        "- Players: {} total, {} scored, {} eliminated\n",
        meta.players_total, meta.players_scored, meta.players_eliminated
    ));
    out.push_str(&format!(
        "- Matches: {} Elo, {} league\n",
        meta.elo_matches, meta.league_matches
    ));
    out.push_str(&format!(
        "- Eligible scores: mean {}, CV {:.2}%, p50 {}, p90 {}\n",
        opt_num(meta.score_summary.mean, 1),
        meta.score_summary.coefficient_of_variation * 100.0,
        opt_num(meta.score_summary.p50, 1),
        opt_num(meta.score_summary.p90, 1)
    ));
    out.push_str(&format!("- Latency: {} ms\n", meta.latency_ms));
    out.push_str(&format!("- Generated: {}\n", meta.generated_at.to_rfc3339()));

    if !meta.personas.is_empty() {
        out.push_str("\n## Reviewers\n\n");
        for p in &meta.personas {
            out.push_str(&format!("- **{}**: {}\n", p.name, p.description));
        }
    }

    out.push_str("\n## Standings\n\n");
    out.push_str("| # | Player | Elo | W-D-L | Pts | Score | Status |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");
    let limit = top_n.unwrap_or(report.players.len());
    for p in report.players.iter().take(limit) {
        out.push_str(&format!(
            "| {} | {} | {} | {}-{}-{} | {} | {} | {} |\n",
            p.rank,
            cell(&p.content, 60),
            opt_num(p.elo, 1),
            p.league.win,
            p.league.draw,
            p.league.lose,
            p.league_score,
            opt_num(p.score, 1),
            p.eliminated.as_deref().unwrap_or("active"),
        ));
    }
    if limit < report.players.len() {
        out.push_str(&format!(
            "\n_{} more players not shown._\n",
            report.players.len() - limit
        ));
    }

    out
}

pub(crate) fn hash_request<T: Serialize>(req: &T) -> String {
    let bytes = serde_json::to_vec(req).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

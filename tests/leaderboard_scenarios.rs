use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cardinal_league::judge::{
    JudgeError, JudgeVerdict, PairwiseJudge, Persona, PersonaRecommender, PointwiseJudge,
    WinnerLabel,
};
use cardinal_league::leaderboard::{
    run_leaderboard, run_leaderboard_with_trace, EloDrawPolicy, Judges, LeaderboardError,
    LeaderboardOptions, LeaderboardRequest, MemoryTraceSink, PlayerInput, PlayerRecord, Stage,
    TraceStage, ELIMINATED_TOO_LOW_SCORE,
};

/// Deterministic judge: pairwise winner is the stronger content, pointwise
/// score comes from a table (default 80).
#[derive(Default)]
struct StubJudge {
    strength: HashMap<String, i32>,
    scores: HashMap<String, f64>,
    fail_compare_on: Option<String>,
    fail_score_on: Option<String>,
    fail_personas: bool,
    delay: Option<Duration>,
    score_calls: AtomicUsize,
    compare_calls: AtomicUsize,
    persona_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubJudge {
    fn ranked(order_best_first: &[&str]) -> Self {
        let n = order_best_first.len() as i32;
        Self {
            strength: order_best_first
                .iter()
                .enumerate()
                .map(|(i, c)| (c.to_string(), n - i as i32))
                .collect(),
            ..Default::default()
        }
    }

    fn with_scores(mut self, scores: &[(&str, f64)]) -> Self {
        self.scores = scores.iter().map(|(c, s)| (c.to_string(), *s)).collect();
        self
    }

    async fn track<T>(&self, fut: impl std::future::Future<Output = T>) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let out = fut.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

#[async_trait]
impl PointwiseJudge for StubJudge {
    async fn score(&self, content: &str, _: &str, _: &[Persona]) -> Result<f64, JudgeError> {
        self.score_calls.fetch_add(1, Ordering::SeqCst);
        self.track(async {
            if self.fail_score_on.as_deref() == Some(content) {
                return Err(JudgeError::Parse("score failed".into()));
            }
            Ok(self.scores.get(content).copied().unwrap_or(80.0))
        })
        .await
    }
}

#[async_trait]
impl PairwiseJudge for StubJudge {
    async fn compare(&self, a: &str, b: &str, _: &str) -> Result<JudgeVerdict, JudgeError> {
        self.compare_calls.fetch_add(1, Ordering::SeqCst);
        self.track(async {
            if let Some(bad) = &self.fail_compare_on {
                if a == bad || b == bad {
                    return Err(JudgeError::Parse("compare failed".into()));
                }
            }
            let sa = self.strength.get(a).copied().unwrap_or(0);
            let sb = self.strength.get(b).copied().unwrap_or(0);
            let winner = match sa.cmp(&sb) {
                std::cmp::Ordering::Greater => WinnerLabel::A,
                std::cmp::Ordering::Less => WinnerLabel::B,
                std::cmp::Ordering::Equal => WinnerLabel::Draw,
            };
            Ok(JudgeVerdict::new(winner))
        })
        .await
    }
}

#[async_trait]
impl PersonaRecommender for StubJudge {
    async fn recommend(&self, samples: &[String], _: &str) -> Result<Vec<Persona>, JudgeError> {
        self.persona_calls.fetch_add(1, Ordering::SeqCst);
        assert!(!samples.is_empty());
        if self.fail_personas {
            return Err(JudgeError::Parse("no personas".into()));
        }
        Ok(vec![
            Persona::new("Editor", "clarity"),
            Persona::new("Engineer", "precision"),
            Persona::new("Buyer", "value"),
        ])
    }
}

fn contents(report: &cardinal_league::LeaderboardReport) -> Vec<&str> {
    report.players.iter().map(|p| p.content.as_str()).collect()
}

#[tokio::test]
async fn shapes_rank_by_league_record() {
    // Pointwise scores run opposite to the league result.
    let judge = StubJudge::ranked(&["Triangle", "Square", "Circle"]).with_scores(&[
        ("Circle", 82.0),
        ("Square", 81.0),
        ("Triangle", 80.0),
    ]);
    let req = LeaderboardRequest::new(
        "sharpest corners",
        vec!["Circle".into(), "Triangle".into(), "Square".into()],
    );

    let report = run_leaderboard(Judges::single(&judge), &req, None)
        .await
        .unwrap();

    assert_eq!(contents(&report), vec!["Triangle", "Square", "Circle"]);
    assert_eq!(report.meta.league_matches, 3);
    assert_eq!(report.meta.elo_matches, 0);
    assert_eq!(
        report.meta.stages,
        vec![Stage::Pointwise, Stage::OutlierElimination, Stage::League]
    );

    let triangle = report.find_by_content("Triangle").unwrap();
    assert_eq!((triangle.league.win, triangle.league.lose), (2, 0));
    assert_eq!(triangle.league_score, 6);
    assert_eq!(triangle.score, Some(80.0));
    let circle = report.find_by_content("Circle").unwrap();
    assert_eq!((circle.league.win, circle.league.lose), (0, 2));
    assert_eq!(circle.score, Some(82.0));
    // Without the Elo stage the reported rating is derived from the score.
    assert_eq!(circle.elo, Some(1032.0));

    assert_eq!(judge.persona_calls.load(Ordering::SeqCst), 1);
    assert_eq!(judge.score_calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.meta.personas.len(), 3);
}

#[tokio::test]
async fn close_ratings_exchange_about_half_k() {
    let judge = StubJudge::ranked(&["first", "second"]);
    let req = LeaderboardRequest::new(
        "c",
        vec![
            PlayerRecord::new("first", "first")
                .with_score(50.0)
                .with_elo(1001.0)
                .into(),
            PlayerRecord::new("second", "second")
                .with_score(50.0)
                .with_elo(999.0)
                .into(),
        ],
    )
    .with_options(LeaderboardOptions {
        elo_population_threshold: 1,
        matches_per_player: 1,
        ..Default::default()
    });

    let report = run_leaderboard(Judges::single(&judge), &req, None)
        .await
        .unwrap();

    let first = report.find("first").unwrap();
    let second = report.find("second").unwrap();
    let (we, le) = (first.elo.unwrap(), second.elo.unwrap());
    assert!((we - 1016.9).abs() < 0.05, "winner elo {we}");
    assert!((le - 983.1).abs() < 0.05, "loser elo {le}");
    assert!(((we + le) - 2000.0).abs() < 1e-4);
    assert_eq!(first.elo_matches, 1);

    // Pre-scored players skip personas and pointwise scoring.
    assert_eq!(judge.persona_calls.load(Ordering::SeqCst), 0);
    assert_eq!(judge.score_calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.meta.players_scored, 0);
}

#[tokio::test]
async fn large_fields_play_elo_before_league() {
    let names: Vec<String> = (0..15).map(|i| format!("player-{i:02}")).collect();
    let order: Vec<&str> = names.iter().rev().map(|s| s.as_str()).collect();
    let scores: Vec<(&str, f64)> = names
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), 80.0 + i as f64 * 0.5))
        .collect();
    let judge = StubJudge::ranked(&order).with_scores(&scores);
    let req = LeaderboardRequest::new(
        "c",
        names.iter().map(|n| PlayerInput::from(n.as_str())).collect(),
    )
    .with_options(LeaderboardOptions {
        rng_seed: Some(1),
        ..Default::default()
    });
    let sink = MemoryTraceSink::new();

    let report = run_leaderboard_with_trace(Judges::single(&judge), &req, None, Some(&sink))
        .await
        .unwrap();

    assert_eq!(
        report.meta.stages,
        vec![
            Stage::Pointwise,
            Stage::OutlierElimination,
            Stage::Elo,
            Stage::League
        ]
    );
    assert_eq!(report.meta.players_eliminated, 0);
    assert_eq!(report.meta.league_matches, 15 * 14 / 2);
    assert!(report.players.iter().all(|p| p.elo_matches >= 3));
    assert_eq!(report.players[0].content, "player-14");

    let events = sink.events();
    let stage_of = |s: TraceStage| events.iter().filter(|e| e.stage == s).count();
    assert_eq!(stage_of(TraceStage::Pointwise), 15);
    assert_eq!(stage_of(TraceStage::Elo), report.meta.elo_matches);
    assert_eq!(stage_of(TraceStage::League), 105);
    let last_elo = events.iter().rposition(|e| e.stage == TraceStage::Elo).unwrap();
    let first_league = events
        .iter()
        .position(|e| e.stage == TraceStage::League)
        .unwrap();
    assert!(last_elo < first_league);
    for e in events.iter().filter(|e| e.stage == TraceStage::Elo) {
        let (before, after) = (e.elo_before.unwrap(), e.elo_after.unwrap());
        assert!(((before[0] + before[1]) - (after[0] + after[1])).abs() < 1e-4);
    }
}

#[tokio::test]
async fn outliers_are_eliminated_but_reported() {
    let judge = StubJudge::ranked(&["a", "b", "c", "low"]).with_scores(&[
        ("a", 90.0),
        ("b", 88.0),
        ("c", 85.0),
        ("low", 20.0),
    ]);
    let req = LeaderboardRequest::new(
        "c",
        vec!["low".into(), "a".into(), "b".into(), "c".into()],
    );

    let report = run_leaderboard(Judges::single(&judge), &req, None)
        .await
        .unwrap();

    assert_eq!(report.players.len(), 4);
    let last = report.players.last().unwrap();
    assert_eq!(last.content, "low");
    assert_eq!(last.eliminated.as_deref(), Some(ELIMINATED_TOO_LOW_SCORE));
    assert_eq!(last.score, Some(20.0));
    assert_eq!(last.league.played(), 0);
    assert_eq!(report.meta.players_eliminated, 1);
    assert_eq!(report.meta.league_matches, 3);
    assert_eq!(judge.compare_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn every_input_player_is_reported_once() {
    let inputs: Vec<PlayerInput> = (0..12)
        .map(|i| PlayerRecord::new(format!("id-{i}"), format!("text {i}")).into())
        .collect();
    let judge = StubJudge::default();
    let req = LeaderboardRequest::new("c", inputs);

    let report = run_leaderboard(Judges::single(&judge), &req, None)
        .await
        .unwrap();

    let ids: HashSet<&str> = report.players.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids.len(), 12);
    assert!((0..12).all(|i| ids.contains(format!("id-{i}").as_str())));
    let ranks: Vec<usize> = report.players.iter().map(|p| p.rank).collect();
    assert_eq!(ranks, (1..=12).collect::<Vec<_>>());

    // All draws: identical records, so input order decides.
    assert!(report.players.iter().all(|p| p.league.draw == 11));
    assert_eq!(report.players[0].id, "id-0");
}

#[tokio::test]
async fn seeded_runs_generate_the_same_ids() {
    let judge = StubJudge::default();
    let req = LeaderboardRequest::new("c", vec!["a".into(), "b".into(), "c".into()])
        .with_options(LeaderboardOptions {
            rng_seed: Some(42),
            ..Default::default()
        });
    let ids = |report: &cardinal_league::LeaderboardReport| {
        let mut ids: Vec<(String, String)> = report
            .players
            .iter()
            .map(|p| (p.content.clone(), p.id.clone()))
            .collect();
        ids.sort();
        ids
    };

    let first = run_leaderboard(Judges::single(&judge), &req, None)
        .await
        .unwrap();
    let second = run_leaderboard(Judges::single(&judge), &req, None)
        .await
        .unwrap();
    assert_eq!(ids(&first), ids(&second));

    let mut reseeded = req.clone();
    reseeded.options.rng_seed = Some(43);
    let third = run_leaderboard(Judges::single(&judge), &reseeded, None)
        .await
        .unwrap();
    assert_ne!(ids(&first), ids(&third));
}

#[tokio::test]
async fn draws_leave_elo_unchanged_by_default() {
    let inputs: Vec<PlayerInput> = (0..4)
        .map(|i| PlayerRecord::new(format!("p{i}"), format!("p{i}")).with_score(60.0).into())
        .collect();
    let judge = StubJudge::default();
    let base = LeaderboardRequest::new("c", inputs).with_options(LeaderboardOptions {
        elo_population_threshold: 2,
        ..Default::default()
    });

    let report = run_leaderboard(Judges::single(&judge), &base, None)
        .await
        .unwrap();
    assert!(report.players.iter().all(|p| p.elo == Some(1010.0)));

    let mut half_point = base.clone();
    half_point.options.elo_draw_policy = EloDrawPolicy::HalfPoint;
    let report = run_leaderboard(Judges::single(&judge), &half_point, None)
        .await
        .unwrap();
    // Equal ratings drawing each other stay equal under half-point scoring too.
    assert!(report
        .players
        .iter()
        .all(|p| (p.elo.unwrap() - 1010.0).abs() < 1e-9));
}

#[tokio::test]
async fn scoring_respects_concurrency_cap() {
    let judge = StubJudge {
        delay: Some(Duration::from_millis(5)),
        ..Default::default()
    };
    let inputs: Vec<PlayerInput> = (0..20).map(|i| PlayerInput::from(format!("x{i}"))).collect();
    let req = LeaderboardRequest::new("c", inputs).with_options(LeaderboardOptions {
        judge_concurrency: 3,
        elo_population_threshold: 100,
        ..Default::default()
    });

    run_leaderboard(Judges::single(&judge), &req, None)
        .await
        .unwrap();

    let peak = judge.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight {peak}");
    assert!(peak >= 2, "calls never overlapped");
}

#[tokio::test]
async fn invalid_options_fail_before_any_judge_call() {
    let judge = StubJudge::default();
    let req = LeaderboardRequest::new("c", vec!["a".into(), "b".into()]).with_options(
        LeaderboardOptions {
            elo_k_factor: -4.0,
            ..Default::default()
        },
    );

    let err = run_leaderboard(Judges::single(&judge), &req, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LeaderboardError::InvalidOptions(_)));
    assert_eq!(judge.persona_calls.load(Ordering::SeqCst), 0);
    assert_eq!(judge.score_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn duplicate_ids_are_rejected() {
    let judge = StubJudge::default();
    let req = LeaderboardRequest::new(
        "c",
        vec![
            PlayerRecord::new("same", "a").into(),
            PlayerRecord::new("same", "b").into(),
        ],
    );
    let err = run_leaderboard(Judges::single(&judge), &req, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LeaderboardError::Registry(_)));
}

#[tokio::test]
async fn judge_failures_abort_the_run() {
    let judge = StubJudge {
        fail_score_on: Some("bad".into()),
        ..Default::default()
    };
    let req = LeaderboardRequest::new("c", vec!["good".into(), "bad".into()]);
    match run_leaderboard(Judges::single(&judge), &req, None).await {
        Err(LeaderboardError::Scoring { .. }) => {}
        other => panic!("expected scoring failure, got {other:?}"),
    }

    let judge = StubJudge {
        fail_compare_on: Some("bad".into()),
        ..Default::default()
    };
    match run_leaderboard(Judges::single(&judge), &req, None).await {
        Err(LeaderboardError::Match { stage, .. }) => assert_eq!(stage, TraceStage::League),
        other => panic!("expected match failure, got {other:?}"),
    }

    let judge = StubJudge {
        fail_personas: true,
        ..Default::default()
    };
    match run_leaderboard(Judges::single(&judge), &req, None).await {
        Err(LeaderboardError::Personas(_)) => {}
        other => panic!("expected persona failure, got {other:?}"),
    }
    assert_eq!(judge.score_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_finite_scores_fail_and_out_of_range_scores_clamp() {
    let judge = StubJudge::default().with_scores(&[("nan", f64::NAN)]);
    let req = LeaderboardRequest::new("c", vec!["ok".into(), "nan".into()]);
    let err = run_leaderboard(Judges::single(&judge), &req, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LeaderboardError::MalformedScore { .. }));

    let judge = StubJudge::default().with_scores(&[("hi", 140.0), ("also", 95.0)]);
    let req = LeaderboardRequest::new("c", vec!["hi".into(), "also".into()]);
    let report = run_leaderboard(Judges::single(&judge), &req, None)
        .await
        .unwrap();
    assert_eq!(report.find_by_content("hi").unwrap().score, Some(100.0));
}

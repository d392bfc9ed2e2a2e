//! Per-judgment trace capture for leaderboard runs.

use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStage {
    Pointwise,
    Elo,
    League,
}

/// One judge outcome: a pointwise score or a pairwise match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchTrace {
    pub timestamp_ms: i64,
    pub stage: TraceStage,
    /// Position within the stage.
    pub sequence: usize,
    /// Elo round, zero-based.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<usize>,
    pub player_a_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_b_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Raw label the judge returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    #[serde(default)]
    pub draw: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elo_before: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elo_after: Option<[f64; 2]>,
}

impl MatchTrace {
    pub fn pointwise(sequence: usize, player_id: &str, score: f64) -> Self {
        Self {
            timestamp_ms: now_epoch_ms(),
            stage: TraceStage::Pointwise,
            sequence,
            round: None,
            player_a_id: player_id.to_string(),
            player_b_id: None,
            score: Some(score),
            label: None,
            winner_id: None,
            draw: false,
            rationale: None,
            elo_before: None,
            elo_after: None,
        }
    }

    pub fn pairwise(stage: TraceStage, sequence: usize, a_id: &str, b_id: &str) -> Self {
        Self {
            timestamp_ms: now_epoch_ms(),
            stage,
            sequence,
            round: None,
            player_a_id: a_id.to_string(),
            player_b_id: Some(b_id.to_string()),
            score: None,
            label: None,
            winner_id: None,
            draw: false,
            rationale: None,
            elo_before: None,
            elo_after: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("trace channel closed")]
    Closed,
    #[error("trace worker failed: {0}")]
    Join(String),
}

pub trait TraceSink: Send + Sync {
    fn record(&self, event: MatchTrace) -> Result<(), TraceError>;
}

/// Trace sink that appends JSON lines from a dedicated writer thread.
///
/// Drop every clone of the sink, then [`TraceWorker::join`] to flush.
#[derive(Clone)]
pub struct JsonlTraceSink {
    sender: mpsc::Sender<MatchTrace>,
}

pub struct TraceWorker {
    handle: Option<std::thread::JoinHandle<Result<(), TraceError>>>,
}

impl TraceWorker {
    pub fn join(mut self) -> Result<(), TraceError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(TraceError::Join("trace worker panicked".to_string()))),
            None => Ok(()),
        }
    }
}

impl JsonlTraceSink {
    pub fn new(path: impl AsRef<Path>) -> Result<(Self, TraceWorker), TraceError> {
        let file = std::fs::File::create(path)?;
        let (sender, receiver) = mpsc::channel::<MatchTrace>();
        let handle = std::thread::spawn(move || write_trace_loop(file, receiver));
        Ok((
            Self { sender },
            TraceWorker {
                handle: Some(handle),
            },
        ))
    }
}

impl TraceSink for JsonlTraceSink {
    fn record(&self, event: MatchTrace) -> Result<(), TraceError> {
        self.sender.send(event).map_err(|_| TraceError::Closed)
    }
}

fn write_trace_loop(
    file: std::fs::File,
    receiver: mpsc::Receiver<MatchTrace>,
) -> Result<(), TraceError> {
    let mut writer = BufWriter::new(file);
    for event in receiver {
        let line = serde_json::to_string(&event).map_err(|e| TraceError::Serde(e.to_string()))?;
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// In-memory sink, handy for inspecting a run.
#[derive(Debug, Default)]
pub struct MemoryTraceSink {
    events: std::sync::Mutex<Vec<MatchTrace>>,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MatchTrace> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl TraceSink for MemoryTraceSink {
    fn record(&self, event: MatchTrace) -> Result<(), TraceError> {
        self.events
            .lock()
            .map_err(|_| TraceError::Join("trace buffer poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

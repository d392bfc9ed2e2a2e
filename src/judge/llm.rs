//! LLM-backed judge over the chat gateway.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{CachedVerdict, VerdictCache, VerdictCacheKey};
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest};
use crate::prompts::{PromptInstance, PAIRWISE_PROMPT, PERSONA_PROMPT, POINTWISE_PROMPT};

use super::{
    format_personas, JudgeError, JudgeVerdict, PairwiseJudge, Persona, PersonaRecommender,
    PointwiseJudge, WinnerLabel,
};

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

const SCORE_MAX_TOKENS: u32 = 256;
const PAIRWISE_MAX_TOKENS: u32 = 256;
const PERSONA_MAX_TOKENS: u32 = 512;

/// Judge that asks a chat model for scores, verdicts and personas.
///
/// Pairwise verdicts go through the optional [`VerdictCache`]. Cache failures
/// are logged and never fail a comparison.
#[derive(Clone)]
pub struct LlmJudge {
    gateway: Arc<dyn ChatGateway>,
    model: ChatModel,
    cache: Option<Arc<dyn VerdictCache>>,
    run_id: Option<Uuid>,
}

impl LlmJudge {
    pub fn new(gateway: Arc<dyn ChatGateway>, model: ChatModel) -> Self {
        Self {
            gateway,
            model,
            cache: None,
            run_id: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn VerdictCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Tag every gateway call with `run_id` for log correlation.
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn model(&self) -> &ChatModel {
        &self.model
    }

    fn attribution(&self, caller: &'static str) -> Attribution {
        let attribution = Attribution::new(caller);
        match self.run_id {
            Some(id) => attribution.with_run(id),
            None => attribution,
        }
    }

    async fn ask(
        &self,
        prompt: PromptInstance,
        caller: &'static str,
        max_tokens: u32,
    ) -> Result<String, JudgeError> {
        let req = ChatRequest::new(
            self.model.clone(),
            prompt.to_messages(),
            self.attribution(caller),
        )
        .max_tokens(max_tokens)
        .json();
        let resp = self.gateway.chat(req).await?;
        Ok(resp.content)
    }

    async fn cached_verdict(&self, key: &VerdictCacheKey) -> Option<JudgeVerdict> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(Some(hit)) => {
                debug!(key = %key.key_hash, "pairwise cache hit");
                Some(JudgeVerdict {
                    winner: WinnerLabel::parse(&hit.winner),
                    rationale: hit.rationale,
                })
            }
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "pairwise cache read failed");
                None
            }
        }
    }

    async fn store_verdict(&self, key: &VerdictCacheKey, verdict: &JudgeVerdict) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        // Unrecognized labels are not worth replaying.
        if matches!(verdict.winner, WinnerLabel::Unrecognized(_)) {
            return;
        }
        let value = CachedVerdict {
            winner: verdict.winner.as_str().to_string(),
            rationale: verdict.rationale.clone(),
        };
        if let Err(err) = cache.put(key, &value).await {
            warn!(error = %err, "pairwise cache write failed");
        }
    }
}

#[async_trait]
impl PointwiseJudge for LlmJudge {
    async fn score(
        &self,
        content: &str,
        criterion: &str,
        personas: &[Persona],
    ) -> Result<f64, JudgeError> {
        let personas = format_personas(personas);
        let prompt = POINTWISE_PROMPT.render(&[
            ("personas", &personas),
            ("criterion", criterion),
            ("content", content),
        ]);
        let raw = self.ask(prompt, "judge::pointwise", SCORE_MAX_TOKENS).await?;
        parse_score_response(&raw)
    }
}

#[async_trait]
impl PairwiseJudge for LlmJudge {
    async fn compare(
        &self,
        content_a: &str,
        content_b: &str,
        criterion: &str,
    ) -> Result<JudgeVerdict, JudgeError> {
        let key = VerdictCacheKey::new(
            self.model.model_id(),
            PAIRWISE_PROMPT.slug,
            &PAIRWISE_PROMPT.hash(),
            criterion,
            content_a,
            content_b,
        );
        if let Some(verdict) = self.cached_verdict(&key).await {
            return Ok(verdict);
        }

        let prompt = PAIRWISE_PROMPT.render(&[
            ("criterion", criterion),
            ("content_a", content_a),
            ("content_b", content_b),
        ]);
        let raw = self.ask(prompt, "judge::pairwise", PAIRWISE_MAX_TOKENS).await?;
        let verdict = parse_pairwise_response(&raw);
        self.store_verdict(&key, &verdict).await;
        Ok(verdict)
    }
}

#[async_trait]
impl PersonaRecommender for LlmJudge {
    async fn recommend(
        &self,
        samples: &[String],
        criterion: &str,
    ) -> Result<Vec<Persona>, JudgeError> {
        let samples = samples
            .iter()
            .enumerate()
            .map(|(i, s)| format!("[{}] {}", i + 1, s.trim()))
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = PERSONA_PROMPT.render(&[("criterion", criterion), ("samples", &samples)]);
        let raw = self
            .ask(prompt, "judge::personas", PERSONA_MAX_TOKENS)
            .await?;
        parse_personas_response(&raw)
    }
}

// =============================================================================
// Response parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct ScoreJson {
    score: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PairwiseJson {
    #[serde(default)]
    winner: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PersonasJson {
    #[serde(default)]
    personas: Vec<Persona>,
}

/// Parse `{"score": n}`. Numeric strings are accepted.
pub fn parse_score_response(raw: &str) -> Result<f64, JudgeError> {
    let parsed: ScoreJson = serde_json::from_str(extract_json(raw))
        .map_err(|e| JudgeError::Parse(format!("score response: {e}")))?;
    let value = parsed
        .score
        .ok_or_else(|| JudgeError::Parse("missing 'score'".into()))?;
    let score = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    score.ok_or_else(|| JudgeError::Parse(format!("score is not a number: {value}")))
}

/// Parse a pairwise verdict.
///
/// Never fails: a reply that is not the expected JSON is read as a bare label,
/// and anything unreadable becomes [`WinnerLabel::Unrecognized`].
pub fn parse_pairwise_response(raw: &str) -> JudgeVerdict {
    match serde_json::from_str::<PairwiseJson>(extract_json(raw)) {
        Ok(PairwiseJson {
            winner: Some(winner),
            rationale,
        }) => JudgeVerdict {
            winner: WinnerLabel::parse(&winner),
            rationale,
        },
        Ok(PairwiseJson { winner: None, .. }) => {
            JudgeVerdict::new(WinnerLabel::Unrecognized(raw.trim().to_string()))
        }
        Err(_) => JudgeVerdict::new(WinnerLabel::parse(raw)),
    }
}

/// Parse `{"personas": [...]}`; at least one named persona is required.
pub fn parse_personas_response(raw: &str) -> Result<Vec<Persona>, JudgeError> {
    let parsed: PersonasJson = serde_json::from_str(extract_json(raw))
        .map_err(|e| JudgeError::Parse(format!("persona response: {e}")))?;
    let personas: Vec<Persona> = parsed
        .personas
        .into_iter()
        .filter(|p| !p.name.trim().is_empty())
        .collect();
    if personas.is_empty() {
        return Err(JudgeError::Parse("no personas in response".into()));
    }
    if personas.len() != 3 {
        warn!(count = personas.len(), "expected three personas");
    }
    Ok(personas)
}

/// First balanced `{...}` object in `raw`, or the trimmed input.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find('{') else {
        return trimmed;
    };
    let remainder = &trimmed[start..];
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in remainder.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &remainder[..=i];
                }
            }
            _ => {}
        }
    }
    trimmed
}

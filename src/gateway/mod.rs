//! Chat gateway used by the LLM judge.
//!
//! [`ProviderGateway`] wraps a single-attempt [`ChatProvider`] with the retry
//! policy: bounded attempts, exponential backoff, multiplicative jitter. Errors
//! that survive the retry budget are returned as typed [`ProviderError`]s.

pub mod error;
pub mod openrouter;
pub mod types;

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use openrouter::{ChatProvider, OpenRouterAdapter};

pub use error::{ErrorContext, ProviderError};
pub use types::*;

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Relative jitter in [0, 1]; 0.25 spreads each delay over ±25%.
    pub jitter: f64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            jitter: 0.25,
        }
    }
}

pub struct ProviderGateway<P: ChatProvider = OpenRouterAdapter> {
    provider: P,
    config: GatewayConfig,
}

impl ProviderGateway<OpenRouterAdapter> {
    pub fn from_env() -> Result<Self, ProviderError> {
        Ok(Self {
            provider: OpenRouterAdapter::from_env()?,
            config: GatewayConfig::default(),
        })
    }
}

impl<P: ChatProvider> ProviderGateway<P> {
    pub fn with_config(provider: P, config: GatewayConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl<P: ChatProvider> ChatGateway for ProviderGateway<P> {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let resp = retry_with_backoff(&self.config, req.attribution.caller, || {
            self.provider.chat(&req)
        })
        .await?;
        debug!(
            caller = req.attribution.caller,
            run_id = ?req.attribution.run_id,
            model = req.model.model_id(),
            input_tokens = resp.input_tokens,
            output_tokens = resp.output_tokens,
            latency_ms = resp.latency.as_millis() as u64,
            "chat completion"
        );
        Ok(resp)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the retry
/// budget in `config` is spent.
pub async fn retry_with_backoff<T, F, Fut>(
    config: &GatewayConfig,
    label: &str,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || attempt >= config.max_retries {
                    return Err(err);
                }
                let delay = backoff_delay(config, attempt).max(
                    err.retry_after()
                        .unwrap_or_default()
                        .min(config.retry_max_delay),
                );
                warn!(
                    label,
                    attempt = attempt + 1,
                    code = err.code(),
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying provider call"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// `base * 2^attempt`, capped at `retry_max_delay`, then scaled by a random
/// factor in `[1 - jitter, 1 + jitter]`.
pub fn backoff_delay(config: &GatewayConfig, attempt: u32) -> Duration {
    let multiplier = 2u32.saturating_pow(attempt.min(16));
    let raw = config
        .retry_base_delay
        .saturating_mul(multiplier)
        .min(config.retry_max_delay);
    let jitter = config.jitter.clamp(0.0, 1.0);
    if jitter == 0.0 || raw.is_zero() {
        return raw;
    }
    let factor = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
    raw.mul_f64(factor)
}

//! Inference call: send the prompt to the backend with timeout and retry.
//!
//! This module is intentionally thin: prompt text lives in
//! [`crate::prompts`] and the wire protocol in [`crate::backend`]. What stays
//! here is the failure policy.
//!
//! ## Retry Strategy
//!
//! Only transient kinds ([`InferenceErrorKind::is_retryable`]) are retried.
//! Exponential backoff (`retry_backoff_ms * 2^(attempt-1)`) with 500 ms base
//! and 3 retries waits 500 ms → 1 s → 2 s. A `Retry-After` from the service
//! wins when it asks for longer. Auth, quota and malformed-request failures
//! return at once.

use crate::backend::{InferenceBackend, InferenceRequest, InferenceResponse};
use crate::config::AnalysisConfig;
use crate::error::{InferenceError, InferenceErrorKind};
use crate::pipeline::prompt::Prompt;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Seed sent in deterministic mode.
pub const DETERMINISTIC_SEED: u64 = 42;

/// Build the backend request for `prompt` from the configuration.
pub fn build_request(prompt: &Prompt, config: &AnalysisConfig) -> InferenceRequest {
    InferenceRequest {
        system: prompt.system.clone(),
        user: prompt.user.clone(),
        temperature: config.effective_temperature(),
        max_tokens: config.max_tokens,
        json_mode: config.deterministic,
        seed: config.deterministic.then_some(DETERMINISTIC_SEED),
    }
}

/// Wait before the retry that follows `retries_done` earlier retries.
///
/// `backoff_ms * 2^retries_done`, saturating, or the server's `Retry-After`
/// when that is longer.
fn retry_delay(backoff_ms: u64, retries_done: u32, retry_after_secs: Option<u64>) -> Duration {
    let backoff = 2u64
        .checked_pow(retries_done)
        .map_or(u64::MAX, |factor| backoff_ms.saturating_mul(factor));
    match retry_after_secs {
        Some(secs) if secs.saturating_mul(1000) > backoff => Duration::from_secs(secs),
        _ => Duration::from_millis(backoff),
    }
}

/// Call `backend` with `prompt`, retrying transient failures.
///
/// Each attempt is bounded by `api_timeout_secs`. Whitespace-only output is
/// an [`InferenceErrorKind::EmptyResponse`] and is not retried. On success
/// returns the response and the number of attempts made; on failure the
/// error's `attempts` field carries the same count.
pub async fn request_completion(
    backend: &dyn InferenceBackend,
    prompt: &Prompt,
    config: &AnalysisConfig,
) -> Result<(InferenceResponse, u32), InferenceError> {
    let request = build_request(prompt, config);
    let per_attempt = Duration::from_secs(config.api_timeout_secs);
    let start = Instant::now();

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;

        let result = match timeout(per_attempt, backend.complete(&request)).await {
            Ok(r) => r,
            Err(_) => Err(InferenceError::new(
                InferenceErrorKind::Timeout,
                format!("no response within {}s", config.api_timeout_secs),
            )),
        };

        let err = match result {
            Ok(response) if response.text.trim().is_empty() => InferenceError::new(
                InferenceErrorKind::EmptyResponse,
                "service returned no text",
            ),
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    backend.name(),
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                if response.truncated {
                    warn!(
                        "{}: response hit the {}-token limit and may be cut short",
                        backend.name(),
                        config.max_tokens
                    );
                }
                return Ok((response, attempt));
            }
            Err(e) => e,
        };

        let retries_done = attempt - 1;
        if !err.is_retryable() || retries_done >= config.max_retries {
            warn!("{}: attempt {} failed: {}", backend.name(), attempt, err);
            return Err(InferenceError { attempts: attempt, ..err });
        }

        let delay = retry_delay(config.retry_backoff_ms, retries_done, err.retry_after_secs);
        warn!(
            "{}: attempt {} failed: {}; retry {}/{} after {:?}",
            backend.name(),
            attempt,
            err,
            attempt,
            config.max_retries,
            delay
        );
        if let Some(cb) = &config.progress_callback {
            cb.on_retry(attempt, config.max_retries, delay, &err.to_string());
        }
        sleep(delay).await;
    }
}

//! Inference backends: "accept a text prompt, return text".
//!
//! The pipeline only ever talks to [`InferenceBackend`]. Two implementations
//! ship with the crate:
//!
//! * [`HttpBackend`]: any OpenAI-compatible chat-completions endpoint,
//!   including Azure OpenAI deployments. HTTP status codes map directly onto
//!   [`InferenceErrorKind`].
//! * [`ProviderBackend`]: wraps an [`edgequake_llm::LLMProvider`], giving
//!   access to every provider edgequake-llm supports.
//!
//! Tests substitute their own implementation; nothing else in the pipeline
//! changes.

mod http;
mod provider;

pub use http::{HttpBackend, HttpBackendConfig};
pub use provider::ProviderBackend;

use crate::error::{InferenceError, InferenceErrorKind};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// One request to a text-generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Ask for a JSON object response where the service supports it.
    pub json_mode: bool,
    /// Sampling seed where the service supports it.
    pub seed: Option<u64>,
}

/// Raw text returned by the service, with usage figures when reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceResponse {
    pub text: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    /// The service stopped at the token limit.
    pub truncated: bool,
}

/// A text-generation service.
///
/// Implementations perform exactly one call per invocation; retry, backoff
/// and timeouts belong to [`crate::pipeline::llm`]. Errors must carry the
/// right [`InferenceErrorKind`] so the retry loop can tell transient causes
/// from terminal ones.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn complete(
        &self,
        request: &InferenceRequest,
    ) -> Result<InferenceResponse, InferenceError>;
}

// Status codes must stand alone: "max 5000 tokens" is not an HTTP 500.
static RE_QUOTA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"quota|billing|credit balance").unwrap());
static RE_RATE_LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b429\b|rate.?limit|too many requests").unwrap());
static RE_AUTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b40[13]\b|unauthori[sz]ed|forbidden|invalid api key|authentication").unwrap()
});
static RE_TIMEOUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"timed out|timeout").unwrap());
static RE_UNAVAILABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b50[023]\b|overloaded|service unavailable",
        r"|connection (?:refused|reset|closed|aborted)",
        r"|error sending request|network (?:error|is unreachable)",
    ))
    .unwrap()
});

/// Classify an error message from a backend that only exposes text.
///
/// Matches the phrases and status codes providers put in their messages.
pub(crate) fn classify_message(message: &str) -> InferenceErrorKind {
    let m = message.to_lowercase();
    if RE_QUOTA.is_match(&m) {
        InferenceErrorKind::QuotaExhausted
    } else if RE_RATE_LIMIT.is_match(&m) {
        InferenceErrorKind::RateLimited
    } else if RE_AUTH.is_match(&m) {
        InferenceErrorKind::AuthRejected
    } else if RE_TIMEOUT.is_match(&m) {
        InferenceErrorKind::Timeout
    } else if RE_UNAVAILABLE.is_match(&m) {
        InferenceErrorKind::Unavailable
    } else {
        InferenceErrorKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_common_messages() {
        assert_eq!(
            classify_message("HTTP 429 Too Many Requests"),
            InferenceErrorKind::RateLimited
        );
        assert_eq!(
            classify_message("You exceeded your current quota, please check your plan"),
            InferenceErrorKind::QuotaExhausted
        );
        assert_eq!(
            classify_message("401 Unauthorized: invalid api key"),
            InferenceErrorKind::AuthRejected
        );
        assert_eq!(
            classify_message("request timed out"),
            InferenceErrorKind::Timeout
        );
        assert_eq!(
            classify_message("503 Service Unavailable: model overloaded"),
            InferenceErrorKind::Unavailable
        );
        assert_eq!(
            classify_message("400 Bad Request: unknown field"),
            InferenceErrorKind::Other
        );
    }

    #[test]
    fn numbers_inside_other_text_are_not_status_codes() {
        assert_eq!(
            classify_message("max 5000 tokens exceeded for this model"),
            InferenceErrorKind::Other
        );
        assert_eq!(
            classify_message("prompt is 4290 tokens, limit 4096"),
            InferenceErrorKind::Other
        );
        assert_eq!(
            classify_message("invalid connection string in request"),
            InferenceErrorKind::Other
        );
        assert_eq!(
            classify_message("HTTP 500 Internal Server Error"),
            InferenceErrorKind::Unavailable
        );
        assert_eq!(
            classify_message("error sending request: Connection refused (os error 111)"),
            InferenceErrorKind::Unavailable
        );
        assert_eq!(
            classify_message("status 403: Forbidden"),
            InferenceErrorKind::AuthRejected
        );
    }
}

//! Configuration types for statement analysis.
//!
//! All pipeline behaviour is controlled through [`AnalysisConfig`], built via
//! [`AnalysisConfigBuilder`]. The library never reads environment variables:
//! the endpoint, credential, size caps and retry bounds are passed in here so
//! every stage can be exercised against a fake backend in tests. The CLI is
//! the only place that maps env vars onto this struct.

use crate::backend::InferenceBackend;
use crate::cache::ResponseCache;
use crate::error::CashflowError;
use crate::pipeline::extract::TextExtractor;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one statement analysis.
///
/// Built via [`AnalysisConfig::builder()`] or [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_cashflow::{AnalysisConfig, AuthScheme};
///
/// let config = AnalysisConfig::builder()
///     .endpoint("https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions")
///     .api_key("secret")
///     .auth_scheme(AuthScheme::ApiKeyHeader)
///     .api_version("2025-01-01-preview")
///     .max_retries(2)
///     .build()
///     .unwrap();
/// assert!(config.deterministic);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Pre-constructed inference backend. Takes precedence over every other
    /// backend setting.
    pub backend: Option<Arc<dyn InferenceBackend>>,

    /// Chat-completions endpoint for the built-in HTTP backend.
    pub endpoint: Option<String>,

    /// Credential for `endpoint`.
    pub api_key: Option<String>,

    /// How `api_key` is sent. Default: bearer token.
    pub auth_scheme: AuthScheme,

    /// Appended as `?api-version=` (Azure OpenAI).
    pub api_version: Option<String>,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama"),
    /// used when no endpoint is configured.
    pub provider_name: Option<String>,

    /// Model identifier. Sent in the request body by the HTTP backend;
    /// selects the model for named providers.
    pub model: Option<String>,

    /// Ask the service to minimise response variance. Default: true.
    ///
    /// Forces temperature 0, a fixed seed and JSON response mode.
    pub deterministic: bool,

    /// Sampling temperature when `deterministic` is off. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8000.
    ///
    /// A long statement lists hundreds of transactions; each costs roughly
    /// 30 output tokens.
    pub max_tokens: usize,

    /// Retries after a transient inference failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-attempt inference timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Password for encrypted PDFs.
    pub password: Option<String>,

    /// Explicit pdfium shared library to bind instead of searching.
    pub pdfium_library_path: Option<PathBuf>,

    /// Replaces the built-in task description. The output-schema section is
    /// always appended.
    pub system_prompt: Option<String>,

    /// Largest document text (in characters) sent to the model.
    /// Default: `Some(120_000)`. `None` disables the cap.
    pub max_document_chars: Option<usize>,

    /// Clean page headers, whitespace and OCR digit confusions before
    /// prompting. Default: true.
    pub preprocess_text: bool,

    /// Fraction of records the parser may drop before failing with
    /// `LowYield`. Default: 0.5.
    pub max_drop_ratio: f64,

    /// Expenses below this absolute amount count as "small" in the health
    /// assessment. Default: 500.
    pub small_expense_threshold: rust_decimal::Decimal,

    /// Make a second model call for advisor-style commentary on the
    /// computed figures. Default: false.
    pub narrative_insights: bool,

    /// Content-addressed response cache shared between runs.
    pub cache: Option<Arc<ResponseCache>>,

    /// Text extractor override. Default: PDF or plain text by magic bytes.
    pub extractor: Option<Arc<dyn TextExtractor>>,

    /// Receives stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            backend: None,
            endpoint: None,
            api_key: None,
            auth_scheme: AuthScheme::default(),
            api_version: None,
            provider_name: None,
            model: None,
            deterministic: true,
            temperature: 0.1,
            max_tokens: 8000,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            password: None,
            pdfium_library_path: None,
            system_prompt: None,
            max_document_chars: Some(120_000),
            preprocess_text: true,
            max_drop_ratio: 0.5,
            small_expense_threshold: rust_decimal::Decimal::new(500, 0),
            narrative_insights: false,
            cache: None,
            extractor: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("auth_scheme", &self.auth_scheme)
            .field("api_version", &self.api_version)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("deterministic", &self.deterministic)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_document_chars", &self.max_document_chars)
            .field("preprocess_text", &self.preprocess_text)
            .field("max_drop_ratio", &self.max_drop_ratio)
            .field("narrative_insights", &self.narrative_insights)
            .field("cache", &self.cache.as_ref().map(|c| c.len()))
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn TextExtractor>"))
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Temperature actually sent to the model.
    pub fn effective_temperature(&self) -> f32 {
        if self.deterministic {
            0.0
        } else {
            self.temperature
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn backend(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.config.auth_scheme = scheme;
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = Some(version.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn deterministic(mut self, v: bool) -> Self {
        self.config.deterministic = v;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_document_chars(mut self, limit: Option<usize>) -> Self {
        self.config.max_document_chars = limit;
        self
    }

    pub fn preprocess_text(mut self, v: bool) -> Self {
        self.config.preprocess_text = v;
        self
    }

    pub fn max_drop_ratio(mut self, ratio: f64) -> Self {
        self.config.max_drop_ratio = ratio;
        self
    }

    pub fn small_expense_threshold(mut self, amount: rust_decimal::Decimal) -> Self {
        self.config.small_expense_threshold = amount;
        self
    }

    pub fn narrative_insights(mut self, v: bool) -> Self {
        self.config.narrative_insights = v;
        self
    }

    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.config.cache = Some(cache);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, CashflowError> {
        let c = &self.config;
        if !(0.0..=1.0).contains(&c.max_drop_ratio) {
            return Err(CashflowError::InvalidConfig(format!(
                "max_drop_ratio must be within 0.0–1.0, got {}",
                c.max_drop_ratio
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(CashflowError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_retries > 10 {
            return Err(CashflowError::InvalidConfig(format!(
                "max_retries must be ≤ 10, got {}",
                c.max_retries
            )));
        }
        if c.max_document_chars == Some(0) {
            return Err(CashflowError::InvalidConfig(
                "max_document_chars must be ≥ 1 (use None to disable the cap)".into(),
            ));
        }
        if c.endpoint.is_some() && c.api_key.is_none() {
            return Err(CashflowError::InvalidConfig(
                "an endpoint was configured without an API key".into(),
            ));
        }
        if c.small_expense_threshold.is_sign_negative() {
            return Err(CashflowError::InvalidConfig(
                "small_expense_threshold must not be negative".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the HTTP backend presents its credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>` (OpenAI and compatible servers).
    #[default]
    Bearer,
    /// `api-key: <key>` (Azure OpenAI).
    ApiKeyHeader,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = AnalysisConfig::default();
        assert!(c.deterministic);
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.max_document_chars, Some(120_000));
        assert_eq!(c.max_drop_ratio, 0.5);
        assert_eq!(c.effective_temperature(), 0.0);
        assert!(!c.narrative_insights);
    }

    #[test]
    fn non_deterministic_uses_temperature() {
        let c = AnalysisConfig::builder()
            .deterministic(false)
            .temperature(0.7)
            .build()
            .unwrap();
        assert!((c.effective_temperature() - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_bad_drop_ratio() {
        let err = AnalysisConfig::builder().max_drop_ratio(1.5).build().unwrap_err();
        assert!(matches!(err, CashflowError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_endpoint_without_key() {
        let err = AnalysisConfig::builder()
            .endpoint("https://api.example.com/v1/chat/completions")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn debug_redacts_key() {
        let c = AnalysisConfig::builder()
            .endpoint("https://api.example.com/v1/chat/completions")
            .api_key("sk-very-secret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-very-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}

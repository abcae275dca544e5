//! Error types for the edgequake-cashflow library.
//!
//! Each pipeline stage owns one error type so callers can tell *where* a run
//! failed without parsing messages:
//!
//! * [`ExtractionError`]: the document could not be turned into page text.
//! * [`DocumentTooLargeError`]: the text exceeds the prompt size cap.
//! * [`InferenceError`]: the external text-generation call failed; its
//!   [`InferenceErrorKind`] tells retryable causes from terminal ones.
//! * [`ParseError`]: the model's answer could not be turned into
//!   transactions.
//!
//! [`CashflowError`] wraps all of them (plus input and configuration errors)
//! and is what the top-level `analyze*` functions return. Nothing in the
//! pipeline substitutes partial or fabricated data for an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-cashflow library.
#[derive(Debug, Error)]
pub enum CashflowError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Statement file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Pipeline stage errors ─────────────────────────────────────────────
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    DocumentTooLarge(#[from] DocumentTooLargeError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// No inference backend could be built from the configuration.
    #[error("Inference provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The document could not be converted into page text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// Neither a PDF nor UTF-8 text.
    #[error("Unsupported document format (first bytes: {magic:?}); expected a PDF or plain text")]
    UnsupportedFormat { magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("Document is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    Corrupt { detail: String },

    /// PDF requires a password but none was provided.
    #[error("Document is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for encrypted document")]
    WrongPassword,

    /// The document opened but has no pages.
    #[error("Document has no pages")]
    NoPages,

    /// Every page is empty; typically a scanned statement without a text layer.
    #[error("None of the {pages} pages contains extractable text (scanned images need OCR first)")]
    NoExtractableText { pages: usize },

    /// The PDF engine could not be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    EngineUnavailable(String),
}

/// The document text is larger than the prompt may carry.
///
/// Raised instead of truncating: a truncated statement silently loses
/// transactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Document text is {chars} characters, exceeding the {limit}-character prompt limit")]
pub struct DocumentTooLargeError {
    pub chars: usize,
    pub limit: usize,
}

/// Why an inference call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InferenceErrorKind {
    /// The call did not complete within the configured timeout.
    Timeout,
    /// The service asked us to slow down (HTTP 429).
    RateLimited,
    /// Network failure or a 5xx from the service.
    Unavailable,
    /// Credential rejected (HTTP 401/403).
    AuthRejected,
    /// Account quota or billing limit exhausted.
    QuotaExhausted,
    /// The service answered with no text at all.
    EmptyResponse,
    /// Anything else, including malformed-request rejections.
    Other,
}

impl InferenceErrorKind {
    /// Transient causes worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            InferenceErrorKind::Timeout
                | InferenceErrorKind::RateLimited
                | InferenceErrorKind::Unavailable
        )
    }
}

impl fmt::Display for InferenceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InferenceErrorKind::Timeout => "timeout",
            InferenceErrorKind::RateLimited => "rate limited",
            InferenceErrorKind::Unavailable => "service unavailable",
            InferenceErrorKind::AuthRejected => "authentication rejected",
            InferenceErrorKind::QuotaExhausted => "quota exhausted",
            InferenceErrorKind::EmptyResponse => "empty response",
            InferenceErrorKind::Other => "request failed",
        };
        f.write_str(s)
    }
}

/// The external inference call failed.
///
/// `attempts` counts every call made, including the failing one; backends
/// report `0` and the retry loop fills in the real number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Inference failed ({kind}) after {attempts} attempt(s): {detail}")]
pub struct InferenceError {
    pub kind: InferenceErrorKind,
    pub detail: String,
    pub attempts: u32,
    /// Server-requested delay before the next attempt, when one was given.
    pub retry_after_secs: Option<u64>,
}

impl InferenceError {
    pub fn new(kind: InferenceErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            attempts: 0,
            retry_after_secs: None,
        }
    }

    pub fn with_retry_after(mut self, secs: Option<u64>) -> Self {
        self.retry_after_secs = secs;
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// The model's answer could not be turned into structured data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// No JSON of the expected shape could be recovered from the response.
    #[error("Model response is not in the expected format: {detail}")]
    Malformed { detail: String },

    /// Too many records failed validation; extraction likely failed wholesale.
    #[error(
        "Only {valid}/{total} records were valid ({dropped} dropped, limit {:.0}%)",
        .max_drop_ratio * 100.0
    )]
    LowYield {
        valid: usize,
        dropped: usize,
        total: usize,
        max_drop_ratio: f64,
    },
}

//! # edgequake-cashflow
//!
//! Turn bank statements into categorised transactions and cash-flow
//! summaries using LLMs.
//!
//! ## Why this crate?
//!
//! Every bank lays out its statements differently, and rule-based parsers
//! break on the next format change. This crate extracts the statement's text
//! layer, asks a language model to list the transactions as JSON, then treats
//! that answer as untrusted input: each record is validated on its own, bad
//! ones are dropped with a reason, and the run fails outright if too many
//! are bad. The totals are exact decimal arithmetic over what survived.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Statement (PDF or text)
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Extract    page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Prompt     clean text, wrap in instructions, enforce size cap
//!  ├─ 4. Inference  one call with timeout, retry and typed errors
//!  ├─ 5. Parse      strip wrapping, validate records, drop-and-count
//!  ├─ 6. Aggregate  monthly summaries, category breakdown, health score
//!  └─ 7. Narrative  optional second call for advisor-style commentary
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_cashflow::{analyze, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig::builder()
//!         .endpoint("https://api.openai.com/v1/chat/completions")
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .model("gpt-4.1-mini")
//!         .build()?;
//!     let output = analyze("statement.pdf", &config).await?;
//!     for month in &output.summary.monthly {
//!         println!("{}: in {} out {}", month.month, month.income, month.expense);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cashflow` binary (clap + anyhow + csv + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-cashflow = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod insights;
pub mod narrative;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod transaction;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_bytes, analyze_sync, extract_text, resolve_backend};
pub use backend::{
    HttpBackend, HttpBackendConfig, InferenceBackend, InferenceRequest, InferenceResponse,
    ProviderBackend,
};
pub use cache::ResponseCache;
pub use config::{AnalysisConfig, AnalysisConfigBuilder, AuthScheme};
pub use error::{
    CashflowError, DocumentTooLargeError, ExtractionError, InferenceError, InferenceErrorKind,
    ParseError,
};
pub use insights::{FinancialHealth, SpendingPatterns};
pub use narrative::NarrativeInsights;
pub use output::{
    AnalysisOutput, AnalysisStats, BalancePoint, CashFlowSummary, CashFlowTotals,
    CategoryBreakdown, DropReason, DroppedRecord, MonthlyCategorySpend, MonthlySummary, YearMonth,
};
pub use pipeline::extract::{
    AutoExtractor, PageTexts, PdfiumExtractor, PlainTextExtractor, TextExtractor,
};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use transaction::{to_rows, Category, Transaction, TransactionRow, TransactionType};

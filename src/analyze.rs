//! Top-level entry points: statement in, cash-flow analysis out.
//!
//! Stages run strictly in order (extract → prompt → inference → parse →
//! aggregate, then the optional narrative call) and any stage error ends the
//! run. Nothing downstream ever sees
//! partial or substituted data.

use crate::backend::{HttpBackend, HttpBackendConfig, InferenceBackend, ProviderBackend};
use crate::cache::ResponseCache;
use crate::config::AnalysisConfig;
use crate::error::CashflowError;
use crate::insights;
use crate::narrative;
use crate::output::{AnalysisOutput, AnalysisStats};
use crate::pipeline::extract::{extract_pages, AutoExtractor, PageTexts, TextExtractor};
use crate::pipeline::{aggregate, input, llm, parse, prompt};
use crate::progress::Stage;
use edgequake_llm::ProviderFactory;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Model used with a named provider when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Analyse a bank statement from a local path or HTTP(S) URL.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns the first stage error: input resolution, extraction, size cap,
/// inference (after retries), or parsing. With narrative insights on, a
/// failed or unreadable narrative call fails the run too. An empty statement
/// is not an error; it yields an empty summary.
pub async fn analyze(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, CashflowError> {
    let input_str = input_str.as_ref();
    info!("Starting analysis: {}", input_str);
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    analyze_bytes(resolved.bytes, config).await
}

/// Analyse a statement already in memory.
///
/// # Example
/// ```rust,no_run
/// use edgequake_cashflow::{analyze_bytes, AnalysisConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("statement.pdf")?;
/// let config = AnalysisConfig::builder().provider_name("openai").build()?;
/// let output = analyze_bytes(bytes, &config).await?;
/// println!("net cash flow: {}", output.summary.totals.net);
/// # Ok(())
/// # }
/// ```
pub async fn analyze_bytes(
    bytes: Vec<u8>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, CashflowError> {
    let total_start = Instant::now();
    let mut stats = AnalysisStats::default();

    // ── Step 1: Resolve backend (fail fast before extraction) ───────────
    let backend = resolve_backend(config)?;
    debug!("Using inference backend: {}", backend.name());

    let cache_key = config.cache.as_ref().map(|_| ResponseCache::key_for(&bytes));

    // ── Step 2: Extract text ─────────────────────────────────────────────
    stage_start(config, Stage::Extract);
    let extract_start = Instant::now();
    let pages = extract_pages(extractor_for(config), bytes, config.password.clone()).await?;
    stats.page_count = pages.len();
    stats.extraction_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} pages in {}ms",
        pages.len(),
        stats.extraction_duration_ms
    );
    stage_complete(config, Stage::Extract, &format!("{} pages", pages.len()));

    // ── Step 3: Build prompt ─────────────────────────────────────────────
    stage_start(config, Stage::Prompt);
    let text = document_text(&pages, config);
    let prompt = prompt::build_prompt(
        &text,
        config.system_prompt.as_deref(),
        config.max_document_chars,
    )?;
    stats.document_chars = prompt.document_chars;
    debug!("Prompt: {} document chars", prompt.document_chars);
    stage_complete(
        config,
        Stage::Prompt,
        &format!("{} chars", prompt.document_chars),
    );

    // ── Step 4: Inference (or cache) ─────────────────────────────────────
    stage_start(config, Stage::Inference);
    let cached = match (&config.cache, &cache_key) {
        (Some(cache), Some(key)) => cache.get(key),
        _ => None,
    };
    let raw = match cached {
        Some(raw) => {
            info!("Cache hit; skipping inference");
            stats.cache_hit = true;
            raw
        }
        None => {
            let llm_start = Instant::now();
            let (response, attempts) =
                llm::request_completion(backend.as_ref(), &prompt, config).await?;
            stats.inference_attempts = attempts;
            stats.input_tokens = response.prompt_tokens;
            stats.output_tokens = response.completion_tokens;
            stats.inference_duration_ms = llm_start.elapsed().as_millis() as u64;
            info!(
                "Inference finished in {}ms ({} attempt(s))",
                stats.inference_duration_ms, attempts
            );
            response.text
        }
    };
    stage_complete(config, Stage::Inference, &format!("{} chars", raw.len()));

    // ── Step 5: Parse ────────────────────────────────────────────────────
    stage_start(config, Stage::Parse);
    let parsed = parse::parse_transactions(&raw, config.max_drop_ratio)?;
    stats.records_total = parsed.total;
    stats.records_dropped = parsed.dropped.len();
    if !stats.cache_hit {
        if let (Some(cache), Some(key)) = (&config.cache, cache_key) {
            cache.insert(key, raw);
        }
    }
    info!(
        "Parsed {} transactions ({} dropped)",
        parsed.transactions.len(),
        parsed.dropped.len()
    );
    stage_complete(
        config,
        Stage::Parse,
        &format!("{} transactions", parsed.transactions.len()),
    );

    // ── Step 6: Aggregate ────────────────────────────────────────────────
    stage_start(config, Stage::Aggregate);
    let transactions = aggregate::correct_categories(&parsed.transactions);
    let summary = aggregate::aggregate(&transactions);
    let health = insights::assess(&transactions, &summary, config.small_expense_threshold);
    stage_complete(
        config,
        Stage::Aggregate,
        &format!("{} months", summary.monthly.len()),
    );

    // ── Step 7: Narrative (opt-in) ───────────────────────────────────────
    let narrative = if config.narrative_insights {
        stage_start(config, Stage::Narrative);
        let (narrative, attempts) =
            narrative::narrate(backend.as_ref(), &summary, &health, config).await?;
        stats.narrative_attempts = attempts;
        stage_complete(
            config,
            Stage::Narrative,
            &format!("{} tips", narrative.tips.len()),
        );
        Some(narrative)
    } else {
        None
    };

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Analysis complete: {} transactions, net {}, {}ms",
        transactions.len(),
        summary.totals.net,
        stats.total_duration_ms
    );

    Ok(AnalysisOutput {
        transactions,
        summary,
        health,
        narrative,
        dropped: parsed.dropped,
        stats,
    })
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, CashflowError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CashflowError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(input_str, config))
}

/// Extract page texts without calling a model.
///
/// Does not require an inference backend or API key.
pub async fn extract_text(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<PageTexts, CashflowError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    extract_pages(extractor_for(config), resolved.bytes, config.password.clone()).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn extractor_for(config: &AnalysisConfig) -> Arc<dyn TextExtractor> {
    match &config.extractor {
        Some(e) => Arc::clone(e),
        None => Arc::new(AutoExtractor::new(config.pdfium_library_path.clone())),
    }
}

fn document_text(pages: &PageTexts, config: &AnalysisConfig) -> String {
    let joined = pages.joined();
    if config.preprocess_text {
        prompt::preprocess_text(&joined)
    } else {
        joined
    }
}

fn stage_start(config: &AnalysisConfig, stage: Stage) {
    if let Some(cb) = &config.progress_callback {
        cb.on_stage_start(stage);
    }
}

fn stage_complete(config: &AnalysisConfig, stage: Stage, detail: &str) {
    if let Some(cb) = &config.progress_callback {
        cb.on_stage_complete(stage, detail);
    }
}

/// Resolve the inference backend, from most-specific to least-specific.
///
/// 1. **Pre-built backend** (`config.backend`) used as-is. Tests and
///    callers with custom middleware go here.
/// 2. **HTTP endpoint** (`config.endpoint` + `config.api_key`): the built-in
///    chat-completions client, including Azure OpenAI deployments.
/// 3. **Named provider** (`config.provider_name`): created through
///    [`ProviderFactory::create_llm_provider`], which looks up that
///    provider's own credentials.
///
/// Anything else is [`CashflowError::ProviderNotConfigured`]; the library
/// never guesses a provider.
pub fn resolve_backend(
    config: &AnalysisConfig,
) -> Result<Arc<dyn InferenceBackend>, CashflowError> {
    if let Some(backend) = &config.backend {
        return Ok(Arc::clone(backend));
    }

    if let Some(endpoint) = &config.endpoint {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| CashflowError::ProviderNotConfigured {
                provider: endpoint.clone(),
                hint: "An API key is required for the HTTP endpoint. \
                       Use --api-key or CASHFLOW_API_KEY."
                    .to_string(),
            })?;
        let backend = HttpBackend::new(HttpBackendConfig {
            endpoint: endpoint.clone(),
            api_key,
            auth_scheme: config.auth_scheme,
            api_version: config.api_version.clone(),
            model: config.model.clone(),
        })?;
        return Ok(Arc::new(backend));
    }

    if let Some(name) = &config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            CashflowError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        })?;
        return Ok(Arc::new(ProviderBackend::new(name.clone(), provider)));
    }

    Err(CashflowError::ProviderNotConfigured {
        provider: "none".to_string(),
        hint: "Set an endpoint and API key (--endpoint/--api-key) or a provider name (--provider)."
            .to_string(),
    })
}

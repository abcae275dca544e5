//! CLI binary for edgequake-cashflow.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `AnalysisConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_cashflow::{
    analyze, extract_text, to_rows, AnalysisConfig, AnalysisOutput, AnalysisProgressCallback,
    AuthScheme, ProgressCallback, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the running stage, plus one
/// log line per finished stage or retry.
struct CliProgressCallback {
    bar: ProgressBar,
    /// The spinner is cleared once this stage completes.
    last: Stage,
}

impl CliProgressCallback {
    fn new(last: Stage) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Analysing");
        bar.set_message("opening statement…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar, last })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        self.bar
            .println(format!("  {} {:<26} {}", green("✓"), stage, dim(detail)));
        if stage == self.last {
            self.bar.finish_and_clear();
        }
    }

    fn on_retry(&self, attempt: u32, max_retries: u32, delay: Duration, error: &str) {
        let msg = if error.len() > 80 {
            let cut = error
                .char_indices()
                .nth(79)
                .map_or(error.len(), |(i, _)| i);
            format!("{}\u{2026}", &error[..cut])
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} retry {}/{} in {:.1}s  {}",
            yellow("↻"),
            attempt,
            max_retries,
            delay.as_secs_f64(),
            dim(&msg)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OpenAI-compatible endpoint
  cashflow --endpoint https://api.openai.com/v1/chat/completions \
           --api-key sk-... --model gpt-4.1-mini statement.pdf

  # Azure OpenAI deployment
  cashflow --endpoint https://NAME.openai.azure.com/openai/deployments/gpt-4o/chat/completions \
           --auth api-key --api-version 2025-01-01-preview statement.pdf

  # Any provider edgequake-llm supports
  cashflow --provider anthropic --model claude-sonnet-4-20250514 statement.pdf

  # Full result as JSON, transactions as CSV
  cashflow --json --csv transactions.csv statement.pdf > analysis.json

  # Add a written summary and saving tips (one extra model call)
  cashflow --provider openai --narrative statement.pdf

  # Show the extracted text only (no API key needed)
  cashflow --extract-only statement.pdf

ENVIRONMENT VARIABLES:
  CASHFLOW_ENDPOINT       Chat-completions URL
  CASHFLOW_API_KEY        Credential for CASHFLOW_ENDPOINT
  CASHFLOW_API_VERSION    Azure OpenAI api-version
  EDGEQUAKE_PROVIDER      Provider name when no endpoint is set
  EDGEQUAKE_MODEL         Model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
"#;

/// Turn bank statements into categorised transactions and cash-flow summaries.
#[derive(Parser, Debug)]
#[command(
    name = "cashflow",
    version,
    about = "Turn bank statements into categorised transactions and cash-flow summaries",
    long_about = "Extract every transaction from a bank statement (PDF or text, local file or URL) \
with a language model, validate the result, and summarise income, expenses and spending \
categories per month.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local statement path (PDF or text) or HTTP/HTTPS URL.
    input: String,

    // ── Inference ────────────────────────────────────────────────────────
    /// OpenAI-compatible chat-completions URL.
    #[arg(long, env = "CASHFLOW_ENDPOINT")]
    endpoint: Option<String>,

    /// API key for --endpoint.
    #[arg(long, env = "CASHFLOW_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// How the API key is sent.
    #[arg(long, env = "CASHFLOW_AUTH", value_enum, default_value = "bearer")]
    auth: AuthArg,

    /// Azure OpenAI api-version query parameter.
    #[arg(long, env = "CASHFLOW_API_VERSION")]
    api_version: Option<String>,

    /// edgequake-llm provider when no endpoint is set: openai, anthropic, gemini, ollama, …
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Model ID (e.g. gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Allow sampling variance (uses --temperature instead of 0).
    #[arg(long, env = "CASHFLOW_NON_DETERMINISTIC")]
    non_deterministic: bool,

    /// Temperature when --non-deterministic is set.
    #[arg(long, env = "CASHFLOW_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max output tokens.
    #[arg(long, env = "CASHFLOW_MAX_TOKENS", default_value_t = 8000)]
    max_tokens: usize,

    /// Retries after a transient inference failure.
    #[arg(long, env = "CASHFLOW_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-attempt inference timeout in seconds.
    #[arg(long, env = "CASHFLOW_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "CASHFLOW_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    // ── Document ─────────────────────────────────────────────────────────
    /// PDF user password for encrypted statements.
    #[arg(long, env = "CASHFLOW_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Path to a text file replacing the built-in task prompt.
    #[arg(long, env = "CASHFLOW_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Largest document text sent to the model, in characters (0 = no cap).
    #[arg(long, env = "CASHFLOW_MAX_CHARS", default_value_t = 120_000)]
    max_chars: usize,

    /// Send extracted text as-is (no page-marker or whitespace cleanup).
    #[arg(long, env = "CASHFLOW_NO_PREPROCESS")]
    no_preprocess: bool,

    /// Fraction of invalid records tolerated before failing (0.0–1.0).
    #[arg(long, env = "CASHFLOW_MAX_DROP_RATIO", default_value_t = 0.5)]
    max_drop_ratio: f64,

    /// Expenses below this amount count as small in the health score.
    #[arg(long, env = "CASHFLOW_SMALL_EXPENSE", default_value = "500")]
    small_expense: String,

    /// Ask the model for a written summary, saving tips and advice (one
    /// extra call).
    #[arg(long, env = "CASHFLOW_NARRATIVE")]
    narrative: bool,

    // ── Output ───────────────────────────────────────────────────────────
    /// Print the whole analysis as JSON.
    #[arg(long, env = "CASHFLOW_JSON")]
    json: bool,

    /// Also write transactions to this CSV file.
    #[arg(long, env = "CASHFLOW_CSV")]
    csv: Option<PathBuf>,

    /// Print the extracted page text and stop.
    #[arg(long)]
    extract_only: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "CASHFLOW_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CASHFLOW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CASHFLOW_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum AuthArg {
    Bearer,
    ApiKey,
}

impl From<AuthArg> for AuthScheme {
    fn from(v: AuthArg) -> Self {
        match v {
            AuthArg::Bearer => AuthScheme::Bearer,
            AuthArg::ApiKey => AuthScheme::ApiKeyHeader,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback; library INFO logs would tear it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.extract_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let last = if cli.narrative {
            Stage::Narrative
        } else {
            Stage::Aggregate
        };
        let cb = CliProgressCallback::new(last);
        Some(cb as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let pages = extract_text(&cli.input, &config)
            .await
            .context("Text extraction failed")?;
        for (i, page) in pages.iter().enumerate() {
            println!("{}", dim(&format!("── page {} ──", i + 1)));
            println!("{page}");
        }
        return Ok(());
    }

    // ── Run analysis ─────────────────────────────────────────────────────
    let output = analyze(&cli.input, &config)
        .await
        .context("Analysis failed")?;

    if let Some(ref path) = cli.csv {
        write_csv(path, &output).with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!(
                "{} {} transactions → {}",
                green("✔"),
                output.transactions.len(),
                bold(&path.display().to_string())
            );
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output);
    }

    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let small_expense = Decimal::from_str(cli.small_expense.trim())
        .with_context(|| format!("Invalid --small-expense amount '{}'", cli.small_expense))?;

    let mut builder = AnalysisConfig::builder()
        .auth_scheme(cli.auth.into())
        .deterministic(!cli.non_deterministic)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .max_document_chars((cli.max_chars > 0).then_some(cli.max_chars))
        .preprocess_text(!cli.no_preprocess)
        .max_drop_ratio(cli.max_drop_ratio)
        .small_expense_threshold(small_expense)
        .narrative_insights(cli.narrative);

    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref version) = cli.api_version {
        builder = builder.api_version(version);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn write_csv(path: &Path, output: &AnalysisOutput) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in to_rows(&output.transactions) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_summary(output: &AnalysisOutput) {
    let totals = &output.summary.totals;

    if output.summary.is_empty() {
        println!("{} No transactions found in this statement.", cyan("◆"));
        return;
    }

    println!();
    if let (Some(first), Some(last)) = (totals.first_date, totals.last_date) {
        println!("{}  {} → {}", bold("Period"), first, last);
    }
    println!(
        "{}  income {}  expense {}  net {}",
        bold("Totals"),
        green(&totals.total_income.to_string()),
        red(&totals.total_expense.to_string()),
        if totals.net.is_sign_negative() {
            red(&totals.net.to_string())
        } else {
            green(&totals.net.to_string())
        }
    );
    println!(
        "        {} transactions, avg savings rate {}%",
        totals.transaction_count, totals.avg_savings_rate
    );

    println!();
    println!(
        "{}",
        bold(&format!(
            "{:<8} {:>14} {:>14} {:>14} {:>9}",
            "Month", "Income", "Expense", "Net", "Savings"
        ))
    );
    for m in &output.summary.monthly {
        println!(
            "{:<8} {:>14} {:>14} {:>14} {:>8}%",
            m.month.to_string(),
            m.income.to_string(),
            m.expense.to_string(),
            m.net.to_string(),
            m.savings_rate.to_string()
        );
    }

    if !output.summary.categories.is_empty() {
        println!();
        println!("{}", bold("Top spending categories"));
        for c in output.summary.top_categories(5) {
            println!(
                "  {:<16} {:>14} {:>7}%  {}",
                c.category.as_str(),
                c.amount.to_string(),
                c.percentage.to_string(),
                dim(&format!("{} txns", c.transaction_count))
            );
        }
    }

    println!();
    let score = output.health.score;
    let score_str = format!("{score}/100");
    println!(
        "{}  {}",
        bold("Financial health"),
        if score >= 70 {
            green(&score_str)
        } else if score >= 40 {
            yellow(&score_str)
        } else {
            red(&score_str)
        }
    );
    for r in &output.health.patterns.recurring_expenses {
        println!("  {} recurring: {} ×{}", dim("·"), r.description, r.occurrences);
    }

    if let Some(ref narrative) = output.narrative {
        println!();
        println!("{}", bold("Insights"));
        println!("  {}", narrative.summary);
        for tip in &narrative.tips {
            println!("  {} {}", green("•"), tip);
        }
        if !narrative.advice.is_empty() {
            println!("  {} {}", bold("Advice:"), narrative.advice);
        }
    }

    if !output.dropped.is_empty() {
        println!();
        println!(
            "{} {} of {} records dropped:",
            yellow("⚠"),
            output.dropped.len(),
            output.stats.records_total
        );
        for d in &output.dropped {
            println!("  {} record {}: {}", dim("·"), d.index, d.reason);
        }
    }

    let stats = &output.stats;
    eprintln!();
    eprintln!(
        "{}",
        dim(&format!(
            "{} pages  {} chars  {} tokens in / {} out  {}ms{}",
            stats.page_count,
            stats.document_chars,
            stats.input_tokens,
            stats.output_tokens,
            stats.total_duration_ms,
            if stats.cache_hit { "  (cached)" } else { "" }
        ))
    );
}

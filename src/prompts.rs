//! Prompts for LLM-based transaction extraction.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing the extraction instructions or
//!    the schema touches exactly one place.
//!
//! 2. **Testability**: unit tests inspect the prompt text directly, so a
//!    taxonomy label missing from the schema is caught without calling a
//!    model.
//!
//! Callers can replace the task description via
//! [`crate::config::AnalysisConfig::system_prompt`]; the schema section from
//! [`output_schema`] is appended regardless, because the parser depends on it.
//!
//! The optional narrative call has its own pair: [`ADVISOR_PROMPT`] and
//! [`advice_message`]. It only ever sees aggregated figures, never the
//! statement text.

use crate::insights::FinancialHealth;
use crate::output::CashFlowSummary;
use crate::transaction::Category;
use std::fmt::Write;

/// Default task description sent as the system message.
pub const DEFAULT_TASK_PROMPT: &str = r#"You are a financial data extraction expert. Your task is to extract transaction data from a bank statement with 100% accuracy.

Follow these rules precisely:

1. COMPLETENESS
   - Extract EVERY transaction in the statement, from the first page to the last
   - Do NOT skip, merge or summarise transactions

2. WHAT TO IGNORE
   - Opening and closing balances, running balance columns
   - Account summaries, interest rate tables, advertisements
   - Repeated page headers and footers

3. FIDELITY
   - Do NOT invent transactions: only extract what is clearly present
   - Keep the description as printed on the statement"#;

/// Output-schema section appended to every system prompt.
///
/// Lists the five fields, the sign convention and every taxonomy label, in
/// [`Category::ALL`] order.
pub fn output_schema() -> String {
    let mut s = String::from(
        r#"

4. OUTPUT FORMAT
   Return ONLY a JSON object of the form {"transactions": [ ... ]} with no
   explanations, no markdown fences and no additional text.
   Each transaction is a JSON object with exactly these fields:
   - "date": the transaction date formatted as YYYY-MM-DD
   - "description": the merchant or transaction description
   - "amount": a JSON number, POSITIVE for money in (credits) and NEGATIVE
     for money out (debits), without currency symbols or thousands separators
   - "type": "credit" for money in, "debit" for money out
   - "category": exactly one of the following labels
"#,
    );
    for category in Category::ALL {
        s.push_str(&format!("     - {} ({})\n", category.as_str(), category.hint()));
    }
    s.push_str(
        r#"   If the statement shows debits as positive numbers in a separate column,
   still return them as negative amounts with "type": "debit"."#,
    );
    s
}

/// Build the user message carrying the statement text.
pub fn statement_message(document_text: &str) -> String {
    format!(
        "Here is the bank statement text content. Extract all transactions following the required format:\n\n{}",
        document_text
    )
}

/// System message for the narrative call.
pub const ADVISOR_PROMPT: &str = r#"You are a friendly financial advisor who reviews bank statement summaries and gives personalised, realistic advice.

Return ONLY a JSON object of the form
{"summary": "...", "tips": ["...", "..."], "advice": "..."}
with no explanations, no markdown fences and no additional text.
- "summary": 3-4 encouraging sentences on the person's situation, addressed to them as "you"
- "tips": 3-5 specific saving opportunities drawn from the spending patterns
- "advice": one piece of advice tailored to this situation
Quote the figures you are given; do not invent new ones."#;

/// Build the user message for the narrative call from computed figures.
pub fn advice_message(summary: &CashFlowSummary, health: &FinancialHealth) -> String {
    let totals = &summary.totals;
    let patterns = &health.patterns;
    let mut m = String::from(
        "Based on the following financial data, write a personalised summary and saving tips.\n\n\
         Financial summary:\n",
    );

    // Writing to a String cannot fail.
    let period = match (totals.first_date, totals.last_date) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "unknown".to_string(),
    };
    let _ = writeln!(m, "- Period: {period}");
    let _ = writeln!(m, "- Total income: {}", totals.total_income);
    let _ = writeln!(m, "- Total expenses: {}", totals.total_expense);
    let _ = writeln!(m, "- Net cash flow: {}", totals.net);
    let _ = writeln!(m, "- Average savings rate: {}%", totals.avg_savings_rate);
    if let Some(top) = totals.top_expense_category {
        let _ = writeln!(m, "- Top expense category: {top} ({})", totals.top_expense_amount);
    }
    let _ = writeln!(m, "- Financial health score: {}/100", health.score);

    m.push_str("\nIncome sources:\n");
    if patterns.top_income_sources.is_empty() {
        m.push_str("- none identified\n");
    }
    for source in &patterns.top_income_sources {
        let _ = writeln!(m, "- {}: {}", source.description, source.amount);
    }

    m.push_str("\nExpense categories:\n");
    if summary.categories.is_empty() {
        m.push_str("- none\n");
    }
    for c in &summary.categories {
        let _ = writeln!(m, "- {}: {} ({}%)", c.category, c.amount, c.percentage);
    }

    m.push_str("\nRecurring expenses:\n");
    if patterns.recurring_expenses.is_empty() {
        m.push_str("- none identified\n");
    }
    for r in &patterns.recurring_expenses {
        let _ = writeln!(m, "- {} ({} times)", r.description, r.occurrences);
    }

    m.push_str("\nUnusually large expenses:\n");
    if patterns.large_expenses.is_empty() {
        m.push_str("- none\n");
    }
    for l in &patterns.large_expenses {
        let _ = writeln!(m, "- {} {}: {}", l.date, l.description, l.amount);
    }

    let _ = write!(m, "\nSmall expenses: {}", patterns.small_expense_count);
    m
}

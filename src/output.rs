//! Result types handed to the presentation layer.
//!
//! Everything here is plain data with `Serialize`: no formatting, no
//! currency symbols, no rounding beyond what the invariants need. Rendering
//! tables, charts and exports is the caller's job.

use crate::insights::FinancialHealth;
use crate::narrative::NarrativeInsights;
use crate::transaction::{Category, Transaction};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;

/// A calendar month, ordered chronologically and displayed as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Income and expense for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    pub month: YearMonth,
    /// Sum of credits.
    pub income: Decimal,
    /// Sum of debits, as a positive number.
    pub expense: Decimal,
    /// `income - expense`.
    pub net: Decimal,
    pub transaction_count: usize,
    /// `net / income` in percent, 2 dp; zero when there was no income.
    pub savings_rate: Decimal,
}

/// Total spend in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    /// Absolute debit total.
    pub amount: Decimal,
    /// Share of total expense in percent, 2 dp. Shares sum to exactly 100.
    pub percentage: Decimal,
    pub transaction_count: usize,
}

/// Debit total for one category in one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCategorySpend {
    pub month: YearMonth,
    pub category: Category,
    pub amount: Decimal,
}

/// Cumulative balance after a transaction, starting from zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub balance: Decimal,
}

/// Whole-statement totals.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CashFlowTotals {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
    pub transaction_count: usize,
    pub avg_monthly_income: Decimal,
    pub avg_monthly_expense: Decimal,
    pub avg_savings_rate: Decimal,
    pub top_expense_category: Option<Category>,
    pub top_expense_amount: Decimal,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Everything the aggregator derives from one transaction list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CashFlowSummary {
    pub totals: CashFlowTotals,
    /// Chronological.
    pub monthly: Vec<MonthlySummary>,
    /// Largest spend first; ties by category label.
    pub categories: Vec<CategoryBreakdown>,
    /// Chronological, then by category label.
    pub monthly_categories: Vec<MonthlyCategorySpend>,
    /// Chronological.
    pub running_balance: Vec<BalancePoint>,
}

impl CashFlowSummary {
    /// The `n` largest spending categories.
    pub fn top_categories(&self, n: usize) -> &[CategoryBreakdown] {
        &self.categories[..n.min(self.categories.len())]
    }

    pub fn is_empty(&self) -> bool {
        self.totals.transaction_count == 0
    }
}

/// Why the parser rejected a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DropReason {
    /// The list element was not an object.
    NotAnObject,
    /// A required field was absent or null.
    MissingField(&'static str),
    /// `description` was present but not a string.
    InvalidDescription,
    /// `date` could not be read as a calendar date.
    InvalidDate(String),
    /// `amount` was not numeric.
    InvalidAmount(String),
    /// `amount` was zero.
    ZeroAmount,
    /// `amount` exceeded [`Transaction::MAX_AMOUNT`] in magnitude.
    AmountOutOfRange(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NotAnObject => write!(f, "record is not an object"),
            DropReason::MissingField(field) => write!(f, "missing field '{field}'"),
            DropReason::InvalidDescription => write!(f, "description is not text"),
            DropReason::InvalidDate(raw) => write!(f, "unparseable date {raw:?}"),
            DropReason::InvalidAmount(raw) => write!(f, "non-numeric amount {raw:?}"),
            DropReason::ZeroAmount => write!(f, "amount is zero"),
            DropReason::AmountOutOfRange(raw) => write!(f, "implausible amount {raw}"),
        }
    }
}

/// A record the parser dropped, by 0-based position in the model's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRecord {
    pub index: usize,
    pub reason: DropReason,
}

/// Per-run statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisStats {
    pub page_count: usize,
    /// Characters of document text sent to the model.
    pub document_chars: usize,
    pub records_total: usize,
    pub records_dropped: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Inference calls made (0 on a cache hit).
    pub inference_attempts: u32,
    /// Calls made for narrative insights (0 when not requested).
    pub narrative_attempts: u32,
    pub cache_hit: bool,
    pub extraction_duration_ms: u64,
    pub inference_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The complete result of analysing one statement.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    /// Validated, category-corrected transactions in statement order.
    pub transactions: Vec<Transaction>,
    pub summary: CashFlowSummary,
    pub health: FinancialHealth,
    /// Present only when narrative insights were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<NarrativeInsights>,
    pub dropped: Vec<DroppedRecord>,
    pub stats: AnalysisStats,
}

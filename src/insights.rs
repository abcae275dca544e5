//! Spending patterns and a 0–100 financial-health score.
//!
//! Everything here is a pure function of the validated transactions and the
//! aggregated summary. No model is consulted, so the same statement always
//! gets the same score.

use crate::output::CashFlowSummary;
use crate::transaction::{Category, Transaction};
use chrono::NaiveDate;
use rust_decimal::{Decimal, MathematicalOps};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Income sources reported in [`SpendingPatterns::top_income_sources`].
const TOP_INCOME_SOURCES: usize = 3;
/// Recurring descriptions reported.
const TOP_RECURRING: usize = 5;
/// Outlier expenses reported.
const TOP_LARGE_EXPENSES: usize = 3;

/// Total credited under one description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomeSource {
    pub description: String,
    pub amount: Decimal,
}

/// An expense description that appears more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecurringExpense {
    pub description: String,
    pub occurrences: usize,
}

/// An unusually large expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LargeExpense {
    pub date: NaiveDate,
    pub description: String,
    /// Signed (negative) amount as on the statement.
    pub amount: Decimal,
}

/// Patterns the health score is computed from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SpendingPatterns {
    /// Largest first.
    pub top_income_sources: Vec<IncomeSource>,
    /// Categories with any spend, as a count.
    pub expense_category_count: usize,
    /// Most frequent first.
    pub recurring_expenses: Vec<RecurringExpense>,
    /// More than two sample standard deviations beyond the mean expense.
    pub large_expenses: Vec<LargeExpense>,
    /// Expenses smaller than the configured threshold.
    pub small_expense_count: usize,
}

/// Health score plus the patterns behind it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FinancialHealth {
    /// 0 (poor) to 100 (excellent).
    pub score: u8,
    pub patterns: SpendingPatterns,
}

/// Derive patterns and score from a statement's transactions.
///
/// `small_expense_threshold` is an absolute amount: expenses whose magnitude
/// is below it count as small.
pub fn assess(
    transactions: &[Transaction],
    summary: &CashFlowSummary,
    small_expense_threshold: Decimal,
) -> FinancialHealth {
    let patterns = spending_patterns(transactions, small_expense_threshold);
    let score = health_score(summary, &patterns);
    FinancialHealth { score, patterns }
}

fn spending_patterns(transactions: &[Transaction], small_threshold: Decimal) -> SpendingPatterns {
    let expenses: Vec<&Transaction> = transactions.iter().filter(|t| t.is_debit()).collect();

    // ── Income sources ───────────────────────────────────────────────────
    let mut income: HashMap<&str, Decimal> = HashMap::new();
    for t in transactions.iter().filter(|t| t.is_credit()) {
        let total = income.entry(t.description()).or_default();
        *total = total.saturating_add(t.amount());
    }
    let mut top_income_sources: Vec<IncomeSource> = income
        .into_iter()
        .map(|(description, amount)| IncomeSource {
            description: description.to_string(),
            amount,
        })
        .collect();
    top_income_sources.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.description.cmp(&b.description))
    });
    top_income_sources.truncate(TOP_INCOME_SOURCES);

    // ── Expense categories ───────────────────────────────────────────────
    let categories: BTreeSet<Category> = expenses.iter().map(|t| t.category()).collect();

    // ── Recurring descriptions ───────────────────────────────────────────
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in &expenses {
        *counts.entry(t.description()).or_default() += 1;
    }
    let mut recurring_expenses: Vec<RecurringExpense> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(description, occurrences)| RecurringExpense {
            description: description.to_string(),
            occurrences,
        })
        .collect();
    recurring_expenses.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then_with(|| a.description.cmp(&b.description))
    });
    recurring_expenses.truncate(TOP_RECURRING);

    // ── Outliers ─────────────────────────────────────────────────────────
    let mut large_expenses: Vec<LargeExpense> = match outlier_cutoff(&expenses) {
        Some(cutoff) => expenses
            .iter()
            .filter(|t| t.amount() < cutoff)
            .map(|t| LargeExpense {
                date: t.date(),
                description: t.description().to_string(),
                amount: t.amount(),
            })
            .collect(),
        None => Vec::new(),
    };
    large_expenses.sort_by(|a, b| a.amount.cmp(&b.amount).then_with(|| a.date.cmp(&b.date)));
    large_expenses.truncate(TOP_LARGE_EXPENSES);

    let small_expense_count = expenses
        .iter()
        .filter(|t| t.amount().abs() < small_threshold)
        .count();

    SpendingPatterns {
        top_income_sources,
        expense_category_count: categories.len(),
        recurring_expenses,
        large_expenses,
        small_expense_count,
    }
}

/// `mean - 2σ` of the (negative) expense amounts, with the sample standard
/// deviation. Undefined below two expenses or when the squares overflow.
fn outlier_cutoff(expenses: &[&Transaction]) -> Option<Decimal> {
    if expenses.len() < 2 {
        return None;
    }
    let n = Decimal::from(expenses.len());
    let mut sum = Decimal::ZERO;
    for t in expenses {
        sum = sum.checked_add(t.amount())?;
    }
    let mean = sum / n;
    let mut squares = Decimal::ZERO;
    for t in expenses {
        let d = t.amount() - mean;
        squares = squares.checked_add(d.checked_mul(d)?)?;
    }
    let sigma = (squares / (n - Decimal::ONE)).sqrt()?;
    mean.checked_sub(Decimal::TWO.checked_mul(sigma)?)
}

fn health_score(summary: &CashFlowSummary, patterns: &SpendingPatterns) -> u8 {
    let totals = &summary.totals;
    let mut score: i32 = 50;

    if totals.net > Decimal::ZERO {
        score += 10;
    }

    let rate = totals.avg_savings_rate;
    if rate > Decimal::from(30) {
        score += 15;
    } else if rate > Decimal::from(20) {
        score += 10;
    } else if rate > Decimal::from(10) {
        score += 5;
    } else if rate < Decimal::ZERO {
        score -= 15;
    }

    if patterns.top_income_sources.len() > 2 {
        score += 5;
    }
    if patterns.expense_category_count > 8 {
        score -= 5;
    }
    if patterns.large_expenses.len() > 2 {
        score -= 5;
    }
    if patterns.small_expense_count > 20 {
        score -= 5;
    }

    score.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::aggregate::aggregate;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn tx(day: u32, desc: &str, amount: Decimal, category: Category) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        Transaction::new(date, desc, amount, category).unwrap()
    }

    #[test]
    fn empty_statement_scores_neutral() {
        let summary = aggregate(&[]);
        let health = assess(&[], &summary, dec(500));
        assert_eq!(health.score, 50);
        assert_eq!(health.patterns, SpendingPatterns::default());
    }

    #[test]
    fn strong_saver_scores_high() {
        let txs = vec![
            tx(1, "SALARY", dec(5000), Category::Income),
            tx(2, "DIVIDEND", dec(200), Category::Investments),
            tx(3, "RENTAL", dec(800), Category::Income),
            tx(4, "GROCER", dec(-1000), Category::Food),
        ];
        let summary = aggregate(&txs);
        let health = assess(&txs, &summary, dec(500));
        // 50 + 10 (net) + 15 (savings > 30%) + 5 (three income sources)
        assert_eq!(health.score, 80);
        assert_eq!(health.patterns.top_income_sources[0].description, "SALARY");
    }

    #[test]
    fn overspender_scores_low() {
        let txs = vec![
            tx(1, "SALARY", dec(1000), Category::Income),
            tx(2, "RENT", dec(-1500), Category::Housing),
        ];
        let summary = aggregate(&txs);
        let health = assess(&txs, &summary, dec(500));
        assert_eq!(health.score, 35);
    }

    #[test]
    fn recurring_expenses_need_two_occurrences() {
        let txs = vec![
            tx(1, "NETFLIX", dec(-15), Category::Entertainment),
            tx(2, "COFFEE", dec(-4), Category::Food),
            tx(3, "COFFEE", dec(-4), Category::Food),
            tx(4, "COFFEE", dec(-4), Category::Food),
            tx(5, "BUS", dec(-2), Category::Transportation),
            tx(6, "BUS", dec(-2), Category::Transportation),
        ];
        let patterns = spending_patterns(&txs, dec(500));
        let names: Vec<_> = patterns
            .recurring_expenses
            .iter()
            .map(|r| (r.description.as_str(), r.occurrences))
            .collect();
        assert_eq!(names, vec![("COFFEE", 3), ("BUS", 2)]);
        assert_eq!(patterns.small_expense_count, 6);
        assert_eq!(patterns.expense_category_count, 3);
    }

    #[test]
    fn outlier_detection() {
        let mut txs: Vec<Transaction> = (1..=10)
            .map(|d| tx(d, "LUNCH", dec(-10), Category::Food))
            .collect();
        txs.push(tx(20, "CAR REPAIR", dec(-2000), Category::Transportation));
        let patterns = spending_patterns(&txs, dec(500));
        assert_eq!(patterns.large_expenses.len(), 1);
        assert_eq!(patterns.large_expenses[0].description, "CAR REPAIR");
    }

    #[test]
    fn single_expense_has_no_outliers() {
        let txs = vec![tx(1, "RENT", dec(-1500), Category::Housing)];
        assert!(spending_patterns(&txs, dec(500)).large_expenses.is_empty());
    }

    #[test]
    fn score_is_clamped() {
        let mut txs = vec![tx(1, "SALARY", dec(100), Category::Income)];
        for d in 2..=28 {
            txs.push(tx(d, "SNACK", dec(-50), Category::ALL[(d as usize) % 15 + 1]));
        }
        let summary = aggregate(&txs);
        let health = assess(&txs, &summary, dec(500));
        assert!(health.score <= 100);
        // net < 0, savings < 0, >8 categories, >20 small expenses
        assert_eq!(health.score, 25);
    }
}

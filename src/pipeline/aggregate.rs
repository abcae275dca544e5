//! Cash-flow aggregation: validated transactions → summaries.
//!
//! Pure and deterministic. All sums are exact [`Decimal`] arithmetic; the
//! only rounding is to 2 dp for percentages and averages. An empty list is a
//! valid statement (a quiet month) and yields zero totals.
//!
//! Nothing here panics on overflow: sums saturate at [`Decimal::MAX`] and a
//! savings rate too large to represent saturates the same way. With every
//! amount bounded by [`Transaction::MAX_AMOUNT`] neither is reachable for a
//! real statement.

use crate::output::{
    BalancePoint, CashFlowSummary, CashFlowTotals, CategoryBreakdown, MonthlyCategorySpend,
    MonthlySummary, YearMonth,
};
use crate::transaction::{Category, Transaction};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Hundredths of a percent in a whole.
const BASIS: i64 = 10_000;

/// Return corrected copies of `transactions`.
///
/// A debit filed under [`Category::Income`] is re-filed under
/// [`Category::Other`]; money going out is never income.
pub fn correct_categories(transactions: &[Transaction]) -> Vec<Transaction> {
    transactions
        .iter()
        .map(|t| {
            if t.is_debit() && t.category() == Category::Income {
                t.with_category(Category::Other)
            } else {
                t.clone()
            }
        })
        .collect()
}

/// Summarise a statement.
pub fn aggregate(transactions: &[Transaction]) -> CashFlowSummary {
    if transactions.is_empty() {
        return CashFlowSummary::default();
    }

    let monthly = monthly_summaries(transactions);
    let categories = category_breakdown(transactions);

    let total_income = sum(
        transactions
            .iter()
            .filter(|t| t.is_credit())
            .map(Transaction::amount),
    );
    let total_expense = sum(
        transactions
            .iter()
            .filter(|t| t.is_debit())
            .map(|t| t.amount().abs()),
    );

    let months = Decimal::from(monthly.len());
    let avg_savings_rate = (sum(monthly.iter().map(|m| m.savings_rate)) / months).round_dp(2);

    let totals = CashFlowTotals {
        total_income,
        total_expense,
        net: total_income - total_expense,
        transaction_count: transactions.len(),
        avg_monthly_income: (total_income / months).round_dp(2),
        avg_monthly_expense: (total_expense / months).round_dp(2),
        avg_savings_rate,
        top_expense_category: categories.first().map(|c| c.category),
        top_expense_amount: categories.first().map_or(Decimal::ZERO, |c| c.amount),
        first_date: transactions.iter().map(Transaction::date).min(),
        last_date: transactions.iter().map(Transaction::date).max(),
    };

    CashFlowSummary {
        totals,
        monthly,
        categories,
        monthly_categories: monthly_category_spend(transactions),
        running_balance: running_balance(transactions),
    }
}

fn monthly_summaries(transactions: &[Transaction]) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<YearMonth, (Decimal, Decimal, usize)> = BTreeMap::new();
    for t in transactions {
        let entry = months.entry(YearMonth::of(t.date())).or_default();
        if t.is_credit() {
            entry.0 = entry.0.saturating_add(t.amount());
        } else {
            entry.1 = entry.1.saturating_add(t.amount().abs());
        }
        entry.2 += 1;
    }

    months
        .into_iter()
        .map(|(month, (income, expense, count))| {
            let net = income - expense;
            MonthlySummary {
                month,
                income,
                expense,
                net,
                transaction_count: count,
                savings_rate: savings_rate(income, net),
            }
        })
        .collect()
}

fn savings_rate(income: Decimal, net: Decimal) -> Decimal {
    if income.is_zero() {
        return Decimal::ZERO;
    }
    net.checked_div(income)
        .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
        .map_or_else(
            || {
                if net.is_sign_negative() {
                    Decimal::MIN
                } else {
                    Decimal::MAX
                }
            },
            |r| r.round_dp(2),
        )
}

/// Saturating sum.
fn sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Debits by category, largest first, with largest-remainder percentages so
/// the shares add up to exactly 100.
fn category_breakdown(transactions: &[Transaction]) -> Vec<CategoryBreakdown> {
    let mut by_category: BTreeMap<Category, (Decimal, usize)> = BTreeMap::new();
    for t in transactions.iter().filter(|t| t.is_debit()) {
        let entry = by_category.entry(t.category()).or_default();
        entry.0 = entry.0.saturating_add(t.amount().abs());
        entry.1 += 1;
    }

    let mut rows: Vec<(Category, Decimal, usize)> = by_category
        .into_iter()
        .map(|(c, (amount, count))| (c, amount, count))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

    let total = sum(rows.iter().map(|r| r.1));
    if total.is_zero() {
        return Vec::new();
    }

    // Whole hundredths of a percent per row, plus what was cut off.
    let basis = Decimal::from(BASIS);
    let mut shares: Vec<(i64, Decimal)> = rows
        .iter()
        .map(|r| {
            // `amount <= total`, so the ratio is at most 1.
            let exact = r.1 / total * basis;
            let floor = exact.floor();
            (floor.to_i64().unwrap_or(0), exact - floor)
        })
        .collect();

    let assigned: i64 = shares.iter().map(|s| s.0).sum();
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| shares[b].1.cmp(&shares[a].1).then(a.cmp(&b)));
    for &i in order.iter().take((BASIS - assigned).max(0) as usize) {
        shares[i].0 += 1;
    }

    rows.into_iter()
        .zip(shares)
        .map(|((category, amount, count), (units, _))| CategoryBreakdown {
            category,
            amount,
            percentage: Decimal::new(units, 2),
            transaction_count: count,
        })
        .collect()
}

fn monthly_category_spend(transactions: &[Transaction]) -> Vec<MonthlyCategorySpend> {
    let mut cells: BTreeMap<(YearMonth, &'static str), (Category, Decimal)> = BTreeMap::new();
    for t in transactions.iter().filter(|t| t.is_debit()) {
        let key = (YearMonth::of(t.date()), t.category().as_str());
        let entry = cells.entry(key).or_insert((t.category(), Decimal::ZERO));
        entry.1 = entry.1.saturating_add(t.amount().abs());
    }
    cells
        .into_iter()
        .map(|((month, _), (category, amount))| MonthlyCategorySpend {
            month,
            category,
            amount,
        })
        .collect()
}

/// Balance after each transaction in date order, starting from zero.
/// Same-day transactions keep statement order.
fn running_balance(transactions: &[Transaction]) -> Vec<BalancePoint> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|t| t.date());

    let mut balance = Decimal::ZERO;
    ordered
        .into_iter()
        .map(|t| {
            balance = balance.saturating_add(t.amount());
            BalancePoint {
                date: t.date(),
                balance,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn tx(date: &str, desc: &str, amount: &str, category: Category) -> Transaction {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Transaction::new(date, desc, d(amount), category).unwrap()
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("2024-01-02", "SALARY", "5000.00", Category::Income),
            tx("2024-01-03", "GROCER", "-42.10", Category::Food),
            tx("2024-01-05", "RENT", "-1200.00", Category::Housing),
            tx("2024-02-01", "SALARY", "5000.00", Category::Income),
            tx("2024-02-03", "CINEMA", "-18.50", Category::Entertainment),
            tx("2024-02-05", "RENT", "-1200.00", Category::Housing),
            tx("2024-02-10", "GROCER", "-63.33", Category::Food),
        ]
    }

    #[test]
    fn monthly_net_reconciles_with_amounts() {
        let txs = sample();
        let summary = aggregate(&txs);
        let monthly_net: Decimal = summary.monthly.iter().map(|m| m.net).sum();
        let amounts: Decimal = txs.iter().map(Transaction::amount).sum();
        assert_eq!(monthly_net, amounts);
        assert_eq!(summary.totals.net, amounts);
        assert_eq!(summary.totals.total_income, d("10000.00"));
        assert_eq!(summary.totals.total_expense, d("2523.93"));
    }

    #[test]
    fn months_are_chronological() {
        let mut txs = sample();
        txs.reverse();
        let summary = aggregate(&txs);
        let months: Vec<String> = summary.monthly.iter().map(|m| m.month.to_string()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02"]);
        assert_eq!(summary.monthly[0].transaction_count, 3);
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let summary = aggregate(&sample());
        let sum: Decimal = summary.categories.iter().map(|c| c.percentage).sum();
        assert_eq!(sum, Decimal::ONE_HUNDRED);

        let thirds = vec![
            tx("2024-01-01", "A", "-1", Category::Food),
            tx("2024-01-01", "B", "-1", Category::Health),
            tx("2024-01-01", "C", "-1", Category::Travel),
        ];
        let summary = aggregate(&thirds);
        let pcts: Vec<Decimal> = summary.categories.iter().map(|c| c.percentage).collect();
        assert_eq!(pcts, vec![d("33.34"), d("33.33"), d("33.33")]);
    }

    #[test]
    fn categories_ordered_by_amount_then_label() {
        let txs = vec![
            tx("2024-01-01", "A", "-10", Category::Travel),
            tx("2024-01-01", "B", "-10", Category::Food),
            tx("2024-01-01", "C", "-30", Category::Housing),
            tx("2024-01-01", "D", "100", Category::Income),
        ];
        let summary = aggregate(&txs);
        let order: Vec<Category> = summary.categories.iter().map(|c| c.category).collect();
        assert_eq!(order, vec![Category::Housing, Category::Food, Category::Travel]);
        assert_eq!(summary.top_categories(1)[0].amount, d("30"));
        assert_eq!(summary.totals.top_expense_category, Some(Category::Housing));
    }

    #[test]
    fn unknown_category_still_counted() {
        let txs = vec![tx("2024-01-01", "MYSTERY", "-25", Category::Other)];
        let summary = aggregate(&txs);
        assert_eq!(summary.categories[0].category, Category::Other);
        assert_eq!(summary.categories[0].percentage, Decimal::ONE_HUNDRED);
    }

    #[test]
    fn empty_input_is_all_zero() {
        let summary = aggregate(&[]);
        assert_eq!(summary.totals, CashFlowTotals::default());
        assert!(summary.monthly.is_empty());
        assert!(summary.categories.is_empty());
        assert!(summary.running_balance.is_empty());
        assert!(summary.is_empty());
    }

    #[test]
    fn income_only_has_no_categories() {
        let txs = vec![tx("2024-01-01", "SALARY", "100", Category::Income)];
        let summary = aggregate(&txs);
        assert!(summary.categories.is_empty());
        assert_eq!(summary.monthly[0].savings_rate, Decimal::ONE_HUNDRED);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let txs = sample();
        assert_eq!(aggregate(&txs), aggregate(&txs));
    }

    #[test]
    fn savings_and_averages() {
        let summary = aggregate(&sample());
        // January: (5000 - 1242.10) / 5000 = 75.158%
        assert_eq!(summary.monthly[0].savings_rate, d("75.16"));
        assert_eq!(summary.totals.avg_monthly_income, d("5000.00"));
        assert_eq!(summary.totals.first_date, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(summary.totals.last_date, NaiveDate::from_ymd_opt(2024, 2, 10));
    }

    #[test]
    fn running_balance_accumulates_in_date_order() {
        let txs = vec![
            tx("2024-01-05", "RENT", "-1200", Category::Housing),
            tx("2024-01-02", "SALARY", "5000", Category::Income),
        ];
        let summary = aggregate(&txs);
        let balances: Vec<Decimal> = summary.running_balance.iter().map(|p| p.balance).collect();
        assert_eq!(balances, vec![d("5000"), d("3800")]);
    }

    #[test]
    fn monthly_category_cells() {
        let summary = aggregate(&sample());
        let jan_food = summary
            .monthly_categories
            .iter()
            .find(|c| c.month.month == 1 && c.category == Category::Food)
            .unwrap();
        assert_eq!(jan_food.amount, d("42.10"));
        assert_eq!(summary.monthly_categories.len(), 5);
    }

    #[test]
    fn debit_labelled_income_is_corrected() {
        let txs = vec![
            tx("2024-01-01", "TRANSFER OUT", "-50", Category::Income),
            tx("2024-01-02", "SALARY", "100", Category::Income),
        ];
        let fixed = correct_categories(&txs);
        assert_eq!(fixed[0].category(), Category::Other);
        assert_eq!(fixed[1].category(), Category::Income);
        assert_eq!(txs[0].category(), Category::Income);
    }

    #[test]
    fn largest_amounts_aggregate_exactly() {
        let max = Transaction::MAX_AMOUNT;
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let txs: Vec<Transaction> = [Category::Housing, Category::Food, Category::Travel]
            .into_iter()
            .map(|c| Transaction::new(date, "WIRE", -max, c).unwrap())
            .chain(std::iter::once(
                Transaction::new(date, "SALE", max, Category::Income).unwrap(),
            ))
            .collect();

        let summary = aggregate(&txs);
        assert_eq!(summary.totals.total_expense, max * Decimal::from(3));
        assert_eq!(summary.totals.net, -max * Decimal::TWO);
        assert_eq!(summary.monthly[0].savings_rate, d("-200"));
        let pct: Vec<Decimal> = summary.categories.iter().map(|c| c.percentage).collect();
        assert_eq!(pct, vec![d("33.34"), d("33.33"), d("33.33")]);
    }

    #[test]
    fn unrepresentable_savings_rate_saturates() {
        let txs = vec![
            tx("2024-06-01", "INTEREST", "0.000000000001", Category::Income),
            tx("2024-06-02", "WIRE", "-1000000000000000", Category::Transfers),
        ];
        let summary = aggregate(&txs);
        assert_eq!(summary.monthly[0].savings_rate, Decimal::MIN);
        assert_eq!(summary.totals.avg_savings_rate, Decimal::MIN);
        assert_eq!(summary.categories[0].percentage, d("100"));
    }

    #[test]
    fn sums_saturate_instead_of_overflowing() {
        let values = [Decimal::MAX, Decimal::MAX, Decimal::ONE];
        assert_eq!(sum(values.into_iter()), Decimal::MAX);
        assert_eq!(sum(std::iter::empty()), Decimal::ZERO);
    }
}

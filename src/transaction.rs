//! Transaction records and the fixed category taxonomy.
//!
//! A [`Transaction`] can only be built through [`Transaction::new`], which
//! rejects a zero amount. Together with [`NaiveDate`] and the closed
//! [`Category`] enum this makes every record in the pipeline valid by
//! construction: downstream stages never re-check dates, labels or signs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One label from the fixed spending taxonomy.
///
/// `Other` is the catch-all: any label the model invents that is not listed
/// here lands in `Other` rather than growing the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Income,
    Housing,
    Utilities,
    Food,
    Transportation,
    Entertainment,
    Shopping,
    Health,
    Education,
    Personal,
    Travel,
    Insurance,
    Investments,
    Transfers,
    Fees,
    Other,
}

impl Category {
    /// Every category, in prompt order.
    pub const ALL: [Category; 16] = [
        Category::Income,
        Category::Housing,
        Category::Utilities,
        Category::Food,
        Category::Transportation,
        Category::Entertainment,
        Category::Shopping,
        Category::Health,
        Category::Education,
        Category::Personal,
        Category::Travel,
        Category::Insurance,
        Category::Investments,
        Category::Transfers,
        Category::Fees,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Income => "Income",
            Category::Housing => "Housing",
            Category::Utilities => "Utilities",
            Category::Food => "Food",
            Category::Transportation => "Transportation",
            Category::Entertainment => "Entertainment",
            Category::Shopping => "Shopping",
            Category::Health => "Health",
            Category::Education => "Education",
            Category::Personal => "Personal",
            Category::Travel => "Travel",
            Category::Insurance => "Insurance",
            Category::Investments => "Investments",
            Category::Transfers => "Transfers",
            Category::Fees => "Fees",
            Category::Other => "Other",
        }
    }

    /// Examples shown to the model next to each label.
    pub fn hint(self) -> &'static str {
        match self {
            Category::Income => "salary, deposits, transfers in",
            Category::Housing => "rent, mortgage, property taxes",
            Category::Utilities => "electricity, water, gas, internet, phone",
            Category::Food => "groceries, restaurants, food delivery",
            Category::Transportation => "fuel, public transit, ride sharing, vehicle expenses",
            Category::Entertainment => "streaming services, movies, events",
            Category::Shopping => "retail, online shopping, electronics",
            Category::Health => "medical bills, pharmacy",
            Category::Education => "tuition, books, courses",
            Category::Personal => "haircuts, gym, clothing",
            Category::Travel => "hotels, flights, vacation expenses",
            Category::Insurance => "health, auto, home, life",
            Category::Investments => "stocks, bonds, retirement contributions",
            Category::Transfers => "money moved between accounts",
            Category::Fees => "bank fees, service charges, penalties",
            Category::Other => "anything that does not fit elsewhere",
        }
    }

    /// Case-insensitive match against the taxonomy; unknown labels map to `Other`.
    pub fn from_label(label: &str) -> Category {
        let label = label.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
            .unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a transaction, always derived from the sign of its amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money in (positive amount).
    Credit,
    /// Money out (negative amount).
    Debit,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }

    /// Parse a model-supplied type label. Accepts the common bank spellings.
    pub fn from_label(label: &str) -> Option<TransactionType> {
        match label.trim().to_ascii_lowercase().as_str() {
            "credit" | "cr" | "deposit" | "inflow" => Some(TransactionType::Credit),
            "debit" | "dr" | "withdrawal" | "outflow" => Some(TransactionType::Debit),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dated, signed, categorised monetary event.
///
/// Positive `amount` is an inflow, negative an outflow. Immutable once built;
/// [`Transaction::with_category`] returns a corrected copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    date: NaiveDate,
    description: String,
    amount: Decimal,
    category: Category,
    #[serde(rename = "type")]
    kind: TransactionType,
}

impl Transaction {
    /// Largest magnitude a single transaction may carry.
    ///
    /// Anything larger is a misread, typically an account number or a
    /// reference parsed as an amount.
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

    /// Build a transaction. Returns `None` for a zero amount or one whose
    /// magnitude exceeds [`Transaction::MAX_AMOUNT`].
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        amount: Decimal,
        category: Category,
    ) -> Option<Self> {
        if amount.is_zero() || amount.abs() > Self::MAX_AMOUNT {
            return None;
        }
        let kind = if amount.is_sign_negative() {
            TransactionType::Debit
        } else {
            TransactionType::Credit
        };
        Some(Self {
            date,
            description: description.into(),
            amount,
            category,
            kind,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn is_debit(&self) -> bool {
        self.kind == TransactionType::Debit
    }

    pub fn is_credit(&self) -> bool {
        self.kind == TransactionType::Credit
    }

    /// A copy of this record filed under another category.
    pub fn with_category(&self, category: Category) -> Self {
        Self {
            category,
            ..self.clone()
        }
    }
}

/// One flat export row: the five transaction fields as plain columns.
///
/// This is the hand-off to row-oriented writers (CSV, spreadsheets);
/// the library itself never writes files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRow {
    pub date: String,
    pub description: String,
    pub amount: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TransactionRow {
    /// Column headers, in serialisation order.
    pub const COLUMNS: [&'static str; 5] =
        ["date", "description", "amount", "category", "type"];
}

impl From<&Transaction> for TransactionRow {
    fn from(t: &Transaction) -> Self {
        Self {
            date: t.date.format("%Y-%m-%d").to_string(),
            description: t.description.clone(),
            amount: t.amount.to_string(),
            category: t.category.as_str().to_string(),
            kind: t.kind.as_str().to_string(),
        }
    }
}

/// Flatten transactions into export rows, preserving order.
pub fn to_rows(transactions: &[Transaction]) -> Vec<TransactionRow> {
    transactions.iter().map(TransactionRow::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn category_matching_is_case_insensitive() {
        assert_eq!(Category::from_label("food"), Category::Food);
        assert_eq!(Category::from_label("  UTILITIES "), Category::Utilities);
        assert_eq!(Category::from_label("Investments"), Category::Investments);
    }

    #[test]
    fn unknown_category_is_other() {
        assert_eq!(Category::from_label("Crypto Gambling"), Category::Other);
        assert_eq!(Category::from_label(""), Category::Other);
    }

    #[test]
    fn all_labels_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::from_label(c.as_str()), c);
        }
    }

    #[test]
    fn kind_follows_sign() {
        let salary = Decimal::new(500000, 2);
        let t = Transaction::new(date(2024, 1, 5), "Salary", salary, Category::Income).unwrap();
        assert_eq!(t.kind(), TransactionType::Credit);
        let rent = Decimal::new(-120000, 2);
        let t = Transaction::new(date(2024, 1, 6), "Rent", rent, Category::Housing).unwrap();
        assert_eq!(t.kind(), TransactionType::Debit);
        assert!(t.is_debit());
    }

    #[test]
    fn zero_amount_rejected() {
        let t = Transaction::new(date(2024, 1, 5), "Nothing", Decimal::ZERO, Category::Other);
        assert!(t.is_none());
    }

    #[test]
    fn max_amount_is_one_quadrillion() {
        assert_eq!(Transaction::MAX_AMOUNT, Decimal::from(1_000_000_000_000_000_i64));
    }

    #[test]
    fn amounts_beyond_the_bound_rejected() {
        let d = date(2024, 1, 5);
        let max = Transaction::MAX_AMOUNT;
        assert!(Transaction::new(d, "Edge", max, Category::Other).is_some());
        assert!(Transaction::new(d, "Edge", -max, Category::Other).is_some());
        let over = max + Decimal::new(1, 2);
        assert!(Transaction::new(d, "Account no.", over, Category::Other).is_none());
        let huge = Decimal::from_parts(0, 0, 0x1000_0000, false, 0);
        assert!(Transaction::new(d, "Reference", huge, Category::Other).is_none());
        assert!(Transaction::new(d, "Reference", -huge, Category::Other).is_none());
    }

    #[test]
    fn with_category_leaves_original_untouched() {
        let refund = Decimal::new(-500, 2);
        let t = Transaction::new(date(2024, 2, 1), "Refund", refund, Category::Income).unwrap();
        let fixed = t.with_category(Category::Other);
        assert_eq!(t.category(), Category::Income);
        assert_eq!(fixed.category(), Category::Other);
        assert_eq!(fixed.amount(), t.amount());
    }

    #[test]
    fn type_labels() {
        assert_eq!(TransactionType::from_label("DEBIT"), Some(TransactionType::Debit));
        assert_eq!(TransactionType::from_label("Cr"), Some(TransactionType::Credit));
        assert_eq!(TransactionType::from_label("unknown"), None);
    }

    #[test]
    fn rows_have_five_columns() {
        let t = Transaction::new(date(2024, 3, 9), "Coffee", Decimal::new(-450, 2), Category::Food)
            .unwrap();
        let rows = to_rows(&[t]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, "2024-03-09");
        assert_eq!(rows[0].amount, "-4.50");
        assert_eq!(rows[0].category, "Food");
        assert_eq!(rows[0].kind, "debit");
        assert_eq!(TransactionRow::COLUMNS.len(), 5);
    }

    #[test]
    fn serialises_type_field() {
        let t = Transaction::new(date(2024, 3, 9), "Coffee", Decimal::new(-450, 2), Category::Food)
            .unwrap();
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["type"], "debit");
        assert_eq!(json["category"], "Food");
        assert_eq!(json["amount"], "-4.50");
        assert_eq!(json["date"], "2024-03-09");
    }
}

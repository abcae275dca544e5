//! Transaction parsing: raw model output → validated transactions.
//!
//! The model's answer is untrusted. It may be wrapped in prose or markdown
//! fences, cut short at the token limit, or contain records with missing or
//! garbled fields. This module recovers what it can, validates every record
//! on its own, and drops the bad ones with a reason. If too many records are
//! dropped the whole parse fails with [`ParseError::LowYield`]: at that point
//! the extraction went wrong wholesale and a partial list would understate
//! every total.
//!
//! ## Stages
//!
//! 1. [`strip_wrapping`]: outer fence, then the span from the first `[`/`{`
//!    to the last matching closer
//! 2. Decode as JSON; on failure [`repair_truncated`] and decode again, then
//!    move on to the next top-level bracket in the prose ([`decode_payload`])
//! 3. Locate the record list (bare array, `{"transactions": [...]}`, any
//!    single array field, or one lone record)
//! 4. Validate each record into a [`Transaction`]

use crate::error::ParseError;
use crate::output::{DropReason, DroppedRecord};
use crate::transaction::{Category, Transaction, TransactionType};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::{debug, warn};

/// Validated transactions plus what was dropped on the way.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseOutcome {
    /// In the order the model listed them.
    pub transactions: Vec<Transaction>,
    pub dropped: Vec<DroppedRecord>,
    /// Records the model returned, valid or not.
    pub total: usize,
}

/// Parse raw model output into transactions.
///
/// Fails with [`ParseError::Malformed`] when no JSON record list can be
/// recovered, and with [`ParseError::LowYield`] when more than
/// `max_drop_ratio` of the records are invalid. An empty list is valid.
pub fn parse_transactions(raw: &str, max_drop_ratio: f64) -> Result<ParseOutcome, ParseError> {
    let records = decode_records(raw)?;
    let total = records.len();

    let mut transactions = Vec::with_capacity(total);
    let mut dropped = Vec::new();
    for (index, record) in records.iter().enumerate() {
        match validate_record(record) {
            Ok(t) => transactions.push(t),
            Err(reason) => {
                warn!("Dropping record {}: {}", index, reason);
                dropped.push(DroppedRecord { index, reason });
            }
        }
    }

    if total > 0 && dropped.len() as f64 / total as f64 > max_drop_ratio {
        return Err(ParseError::LowYield {
            valid: transactions.len(),
            dropped: dropped.len(),
            total,
            max_drop_ratio,
        });
    }

    debug!(
        "Parsed {} transactions ({} of {} records dropped)",
        transactions.len(),
        dropped.len(),
        total
    );
    Ok(ParseOutcome {
        transactions,
        dropped,
        total,
    })
}

// ── Wrapping ─────────────────────────────────────────────────────────────────

static RE_FENCED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Bracket groups in the surrounding prose tried as the payload before
/// giving up.
const MAX_PAYLOAD_STARTS: usize = 16;

/// Strip prose and markdown fences around the JSON payload.
///
/// Returns the span from the first `[` or `{` to the last `]` or `}`
/// respectively; when the closer is missing (truncated output) the span runs
/// to the end of the text.
pub fn strip_wrapping(raw: &str) -> &str {
    let body = unfence(raw);
    match body.find(|c| c == '[' || c == '{') {
        Some(start) => span_from(body, start),
        None => body.trim(),
    }
}

/// Every span that may hold the payload, [`strip_wrapping`]'s first.
///
/// Prose can carry its own brackets (`I found {1} transaction [see below]:`),
/// so each top-level `[`/`{` in the text starts a candidate. Brackets nested
/// inside an earlier group never do: a broken list is not rescued by
/// decoding one of its records on its own.
fn payload_candidates(raw: &str) -> Vec<&str> {
    let body = unfence(raw);
    let spans: Vec<&str> = top_level_openers(body)
        .into_iter()
        .map(|start| span_from(body, start))
        .collect();
    if spans.is_empty() {
        vec![body.trim()]
    } else {
        spans
    }
}

fn unfence(raw: &str) -> &str {
    let raw = raw.trim_start_matches('\u{feff}');
    if let Some(caps) = RE_FENCED.captures(raw) {
        caps.get(1).map_or(raw, |m| m.as_str())
    } else if let Some(rest) = raw.trim_start().strip_prefix("```") {
        // Opening fence with no closing fence.
        rest.split_once('\n').map_or("", |(_, b)| b)
    } else {
        raw
    }
}

fn span_from(body: &str, start: usize) -> &str {
    let closer = if body[start..].starts_with('[') { ']' } else { '}' };
    match body.rfind(closer) {
        Some(end) if end > start => &body[start..=end],
        _ => body[start..].trim_end(),
    }
}

/// Byte offsets of the `[`/`{` that open a bracket group at depth 0.
///
/// Quotes only delimit strings inside a group; in prose they are text.
fn top_level_openers(body: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '[' | '{' => {
                if depth == 0 {
                    starts.push(i);
                    if starts.len() == MAX_PAYLOAD_STARTS {
                        break;
                    }
                }
                depth += 1;
            }
            ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    starts
}

/// Recover JSON cut off mid-record.
///
/// Cuts back to the last complete record (the last `}`) and closes every
/// array or object still open at that point. Returns `None` when there is
/// nothing to close.
pub fn repair_truncated(payload: &str) -> Option<String> {
    let end = payload.rfind('}')?;
    let cut = &payload[..=end];

    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in cut.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ']' | '}' => {
                stack.pop();
            }
            _ => {}
        }
    }

    if stack.is_empty() || in_string {
        return None;
    }
    let mut repaired = cut.to_string();
    repaired.extend(stack.iter().rev());
    Some(repaired)
}

fn decode_records(raw: &str) -> Result<Vec<Value>, ParseError> {
    records_of(decode_payload(raw)?)
}

/// Decode the JSON payload of a model response.
///
/// Tries each candidate span in order, repairing truncated output, and
/// returns the first that decodes. The error reports why the first
/// candidate failed.
pub fn decode_payload(raw: &str) -> Result<Value, ParseError> {
    let mut first_error = None;
    for payload in payload_candidates(raw) {
        if payload.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(payload) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let repaired = repair_truncated(payload)
                    .and_then(|s| serde_json::from_str::<Value>(&s).ok());
                if let Some(v) = repaired {
                    warn!("Model output was truncated; recovered the complete records");
                    return Ok(v);
                }
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }
    Err(ParseError::Malformed {
        detail: first_error.unwrap_or_else(|| "response contains no JSON".to_string()),
    })
}

/// Find the record list inside a decoded response.
fn records_of(value: Value) -> Result<Vec<Value>, ParseError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            let key = map
                .keys()
                .find(|k| k.eq_ignore_ascii_case("transactions"))
                .cloned();
            if let Some(key) = key {
                return match map.remove(&key) {
                    Some(Value::Array(items)) => Ok(items),
                    _ => Err(ParseError::Malformed {
                        detail: format!("'{key}' is not a list"),
                    }),
                };
            }

            let arrays: Vec<&String> = map
                .iter()
                .filter(|(_, v)| v.is_array())
                .map(|(k, _)| k)
                .collect();
            if arrays.len() == 1 {
                let key = arrays[0].clone();
                if let Some(Value::Array(items)) = map.remove(&key) {
                    return Ok(items);
                }
            }

            if ["date", "amount", "description"]
                .iter()
                .any(|f| field(&map, f).is_some())
            {
                return Ok(vec![Value::Object(map)]);
            }

            Err(ParseError::Malformed {
                detail: "object has no transaction list".to_string(),
            })
        }
        other => Err(ParseError::Malformed {
            detail: format!("expected a list of records, got {}", kind_of(&other)),
        }),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

// ── Record validation ────────────────────────────────────────────────────────

/// Case-insensitive field lookup; `null` counts as absent.
fn field<'a>(record: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    record
        .iter()
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
        .filter(|v| !v.is_null())
}

fn validate_record(record: &Value) -> Result<Transaction, DropReason> {
    let obj = record.as_object().ok_or(DropReason::NotAnObject)?;

    let date = match field(obj, "date") {
        Some(v) => coerce_date(v)?,
        None => return Err(DropReason::MissingField("date")),
    };

    let description = match field(obj, "description") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim(),
        Some(Value::String(_)) | None => return Err(DropReason::MissingField("description")),
        Some(_) => return Err(DropReason::InvalidDescription),
    };

    let mut amount = match field(obj, "amount") {
        Some(v) => coerce_amount(v)?,
        None => return Err(DropReason::MissingField("amount")),
    };
    if amount.abs() > Transaction::MAX_AMOUNT {
        return Err(DropReason::AmountOutOfRange(amount.to_string()));
    }

    let kind = field(obj, "type")
        .and_then(Value::as_str)
        .and_then(TransactionType::from_label);
    match kind {
        Some(TransactionType::Debit) => amount = -amount.abs(),
        Some(TransactionType::Credit) => amount = amount.abs(),
        None => {}
    }

    let category = field(obj, "category")
        .and_then(Value::as_str)
        .map(Category::from_label)
        .unwrap_or(Category::Other);

    Transaction::new(date, description, amount, category).ok_or(DropReason::ZeroAmount)
}

// ── Dates ────────────────────────────────────────────────────────────────────

/// Formats tried in order after ISO `YYYY-MM-DD`. Day-first before
/// month-first for ambiguous numeric dates.
const DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d %b %y",
    "%d-%b-%y",
    "%b %d, %Y",
    "%b %d %Y",
];

fn coerce_date(v: &Value) -> Result<NaiveDate, DropReason> {
    let raw = match v {
        Value::String(s) => s.trim(),
        other => return Err(DropReason::InvalidDate(other.to_string())),
    };
    parse_date(raw).ok_or_else(|| DropReason::InvalidDate(raw.to_string()))
}

/// Read a statement date. Years before 1900 are rejected so a two-digit
/// year never parses as the first century.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let plausible = |d: NaiveDate| (d.year() >= 1900).then_some(d);

    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return plausible(d);
    }
    // ISO timestamp: keep the date part.
    if raw.len() > 10 && raw.is_char_boundary(10) {
        if let Ok(d) = NaiveDate::parse_from_str(&raw[..10], "%Y-%m-%d") {
            return plausible(d);
        }
    }
    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .find_map(plausible)
}

// ── Amounts ──────────────────────────────────────────────────────────────────

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₩', '₽', '¢'];

static RE_CURRENCY_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)rs\.?|inr|usd|eur|gbp|aud|cad|sgd").unwrap());

static RE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\d+(?:\.\d*)?|\.\d+)$").unwrap());

fn coerce_amount(v: &Value) -> Result<Decimal, DropReason> {
    match v {
        Value::Number(n) => {
            let s = n.to_string();
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .map_err(|_| DropReason::InvalidAmount(s))
        }
        Value::String(s) => parse_amount(s).ok_or_else(|| DropReason::InvalidAmount(s.clone())),
        other => Err(DropReason::InvalidAmount(other.to_string())),
    }
}

/// Read an amount as printed on a statement.
///
/// Handles currency symbols and codes, thousands separators, and the usual
/// sign markers: leading or trailing `-`, parentheses and a `DR` suffix make
/// the amount negative; a `CR` suffix makes it positive.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut s = raw.trim();
    let mut negative = false;
    let mut credit = false;

    let upper = s.to_ascii_uppercase();
    let marked = upper.trim_end_matches('.').trim_end();
    if marked.ends_with("DR") {
        negative = true;
        s = &s[..marked.len() - 2];
    } else if marked.ends_with("CR") {
        credit = true;
        s = &s[..marked.len() - 2];
    }
    s = s.trim();

    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        negative = true;
        s = &s[1..s.len() - 1];
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();
    let cleaned = RE_CURRENCY_CODE.replace_all(&cleaned, "");

    let mut body: &str = &cleaned;
    if let Some(rest) = body.strip_suffix('-') {
        negative = true;
        body = rest;
    }
    if let Some(rest) = body.strip_prefix('-') {
        negative = true;
        body = rest;
    } else if let Some(rest) = body.strip_prefix('+') {
        body = rest;
    }

    if !RE_NUMBER.is_match(body) {
        return None;
    }
    let value = Decimal::from_str(body).ok()?;
    Some(if negative && !credit { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::aggregate::aggregate;

    const FIVE_GOOD: &str = r#"[
        {"date": "2024-01-02", "description": "SALARY", "amount": 5000.00, "type": "credit", "category": "Income"},
        {"date": "2024-01-03", "description": "GROCER", "amount": -42.10, "type": "debit", "category": "Food"},
        {"date": "2024-01-05", "description": "RENT", "amount": -1200, "type": "debit", "category": "Housing"},
        {"date": "2024-01-09", "description": "BUS PASS", "amount": -60, "type": "debit", "category": "Transportation"},
        {"date": "2024-01-15", "description": "POWER CO", "amount": -80.55, "type": "debit", "category": "Utilities"}
    ]"#;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_clean_array() {
        let out = parse_transactions(FIVE_GOOD, 0.5).unwrap();
        assert_eq!(out.total, 5);
        assert_eq!(out.transactions.len(), 5);
        assert!(out.dropped.is_empty());
        assert_eq!(out.transactions[1].amount(), d("-42.10"));
        assert_eq!(out.transactions[1].category(), Category::Food);
    }

    #[test]
    fn wrapping_does_not_change_result() {
        let bare = parse_transactions(FIVE_GOOD, 0.5).unwrap();
        let variants = [
            format!("```json\n{FIVE_GOOD}\n```"),
            format!("Here are the transactions:\n```json\n{FIVE_GOOD}\n```\nAnything else?"),
            format!("Sure! {FIVE_GOOD} Hope this helps."),
            format!("```\n{{\"transactions\": {FIVE_GOOD}}}\n```"),
            format!("I found {{5}} transactions [see below]:\n{FIVE_GOOD}\nDone."),
            format!("Totals are in \"USD\" [1] {{approx}}: {FIVE_GOOD}"),
        ];
        for v in &variants {
            assert_eq!(parse_transactions(v, 0.5).unwrap(), bare, "variant: {v}");
        }
    }

    #[test]
    fn broken_list_is_not_rescued_by_one_record() {
        let raw = r#"Here you go: [{"date": "2024-01-02", "description": "A", "amount": 1,,},
                      {"date": "2024-01-03", "description": "B", "amount": 2}]"#;
        let err = parse_transactions(raw, 0.5).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn prose_brackets_alone_are_malformed() {
        let err = parse_transactions("See [page 2] for {details}.", 0.5).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn top_level_openers_skip_nested_brackets() {
        let body = r#"x {1} y [a] [{"d": "[x]"}, {}]"#;
        let starts = top_level_openers(body);
        assert_eq!(starts, vec![2, 8, 12]);
        assert_eq!(&body[starts[2]..], r#"[{"d": "[x]"}, {}]"#);
    }

    #[test]
    fn one_bad_record_in_five_is_dropped() {
        let raw = r#"[
            {"date": "2024-01-02", "description": "SALARY", "amount": 5000},
            {"date": "2024-01-03", "description": "GROCER", "amount": "forty"},
            {"date": "2024-01-05", "description": "RENT", "amount": -1200},
            {"date": "2024-01-09", "description": "BUS", "amount": -60},
            {"date": "2024-01-15", "description": "POWER", "amount": -80}
        ]"#;
        let out = parse_transactions(raw, 0.5).unwrap();
        assert_eq!(out.transactions.len(), 4);
        assert_eq!(out.dropped.len(), 1);
        assert_eq!(out.dropped[0].index, 1);
        assert_eq!(out.dropped[0].reason, DropReason::InvalidAmount("forty".into()));
    }

    #[test]
    fn four_bad_records_in_five_is_low_yield() {
        let raw = r#"[
            {"date": "2024-01-02", "description": "SALARY", "amount": 5000},
            {"date": "someday", "description": "A", "amount": -1},
            {"description": "B", "amount": -1},
            {"date": "2024-01-09", "amount": -60},
            "not a record"
        ]"#;
        let err = parse_transactions(raw, 0.5).unwrap_err();
        assert_eq!(
            err,
            ParseError::LowYield {
                valid: 1,
                dropped: 4,
                total: 5,
                max_drop_ratio: 0.5
            }
        );
    }

    #[test]
    fn unknown_category_becomes_other() {
        let raw = r#"[{"date": "2024-02-01", "description": "MYSTERY", "amount": -10, "category": "Crypto"},
                      {"date": "2024-02-02", "description": "NOCAT", "amount": -5}]"#;
        let out = parse_transactions(raw, 0.5).unwrap();
        assert_eq!(out.transactions.len(), 2);
        assert!(out.transactions.iter().all(|t| t.category() == Category::Other));
    }

    #[test]
    fn type_fixes_sign() {
        let raw = r#"[{"date": "2024-02-01", "description": "ATM", "amount": 100, "type": "debit"},
                      {"date": "2024-02-02", "description": "REFUND", "amount": -20, "type": "Credit"}]"#;
        let out = parse_transactions(raw, 0.5).unwrap();
        assert_eq!(out.transactions[0].amount(), d("-100"));
        assert!(out.transactions[0].is_debit());
        assert_eq!(out.transactions[1].amount(), d("20"));
    }

    #[test]
    fn field_names_are_case_insensitive() {
        let raw = r#"{"Transactions": [{"Date": "2024-03-01", "DESCRIPTION": "X", "Amount": "12.50", "Category": "food"}]}"#;
        let out = parse_transactions(raw, 0.5).unwrap();
        assert_eq!(out.transactions[0].amount(), d("12.50"));
        assert_eq!(out.transactions[0].category(), Category::Food);
    }

    #[test]
    fn single_array_field_and_lone_record() {
        let raw = r#"{"items": [{"date": "2024-03-01", "description": "X", "amount": 1}], "note": "ok"}"#;
        assert_eq!(parse_transactions(raw, 0.5).unwrap().total, 1);
        let raw = r#"{"date": "2024-03-01", "description": "X", "amount": 1}"#;
        assert_eq!(parse_transactions(raw, 0.5).unwrap().total, 1);
    }

    #[test]
    fn zero_amount_is_dropped() {
        let raw = r#"[{"date": "2024-03-01", "description": "X", "amount": 0},
                      {"date": "2024-03-01", "description": "Y", "amount": 3}]"#;
        let out = parse_transactions(raw, 0.5).unwrap();
        assert_eq!(out.dropped[0].reason, DropReason::ZeroAmount);
    }

    #[test]
    fn implausible_amounts_are_dropped() {
        let raw = r#"[{"date": "2024-03-01", "description": "REF", "amount": "-10000000000000000000000000"},
                      {"date": "2024-03-02", "description": "ACCT", "amount": 1e25},
                      {"date": "2024-03-03", "description": "BIG", "amount": "999,999,999,999,999.99"},
                      {"date": "2024-03-04", "description": "RENT", "amount": -1200},
                      {"date": "2024-03-05", "description": "PAY", "amount": 3000}]"#;
        let out = parse_transactions(raw, 0.5).unwrap();
        assert_eq!(out.total, 5);
        assert_eq!(out.transactions.len(), 3);
        assert_eq!(out.dropped.len(), 2);
        assert!(out
            .dropped
            .iter()
            .all(|d| matches!(d.reason, DropReason::AmountOutOfRange(_))));
        assert_eq!(out.transactions[0].amount(), d("999999999999999.99"));
        assert_eq!(aggregate(&out.transactions).totals.transaction_count, 3);
    }

    #[test]
    fn empty_list_is_valid() {
        let out = parse_transactions("[]", 0.5).unwrap();
        assert_eq!(out, ParseOutcome::default());
        let out = parse_transactions(r#"{"transactions": []}"#, 0.5).unwrap();
        assert_eq!(out.total, 0);
    }

    #[test]
    fn prose_only_is_malformed() {
        let err = parse_transactions("I could not find any transactions.", 0.5).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
        let err = parse_transactions("\"just a string\"", 0.5).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn truncated_array_is_recovered() {
        let raw = r#"[{"date": "2024-01-02", "description": "A", "amount": 1},
                      {"date": "2024-01-03", "description": "B", "amount": 2},
                      {"date": "2024-01-04", "descr"#;
        let out = parse_transactions(raw, 0.5).unwrap();
        assert_eq!(out.total, 2);
    }

    #[test]
    fn truncated_object_is_recovered() {
        let raw = "```json\n{\"transactions\": [{\"date\": \"2024-01-02\", \"description\": \"A\", \"amount\": 1}, {\"date\": \"2024";
        let out = parse_transactions(raw, 0.5).unwrap();
        assert_eq!(out.total, 1);
    }

    #[test]
    fn repair_ignores_brackets_in_strings() {
        let repaired =
            repair_truncated(r#"[{"description": "A [x] {y}", "amount": 1}, {"da"#).unwrap();
        assert_eq!(repaired, r#"[{"description": "A [x] {y}", "amount": 1}]"#);
        assert!(repair_truncated("[1, 2").is_none());
    }

    #[test]
    fn amount_formats() {
        assert_eq!(parse_amount("$1,234.50"), Some(d("1234.50")));
        assert_eq!(parse_amount("(45.00)"), Some(d("-45.00")));
        assert_eq!(parse_amount("45.00-"), Some(d("-45.00")));
        assert_eq!(parse_amount("1,000.00 DR"), Some(d("-1000.00")));
        assert_eq!(parse_amount("500 Cr."), Some(d("500")));
        assert_eq!(parse_amount("₹ 2,500"), Some(d("2500")));
        assert_eq!(parse_amount("Rs. 300"), Some(d("300")));
        assert_eq!(parse_amount("-£12"), Some(d("-12")));
        assert_eq!(parse_amount("ten"), None);
        assert_eq!(parse_amount("1.2.3"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn date_formats() {
        let jan3 = date(2024, 1, 3);
        assert_eq!(parse_date("2024-01-03"), Some(jan3));
        assert_eq!(parse_date("2024/01/03"), Some(jan3));
        assert_eq!(parse_date("03/01/2024"), Some(jan3));
        assert_eq!(parse_date("03/01/24"), Some(jan3));
        assert_eq!(parse_date("3 Jan 2024"), Some(jan3));
        assert_eq!(parse_date("03-Jan-2024"), Some(jan3));
        assert_eq!(parse_date("Jan 3, 2024"), Some(jan3));
        assert_eq!(parse_date("2024-01-03T10:00:00Z"), Some(jan3));
        // Month-first when day-first is impossible.
        assert_eq!(parse_date("01/31/2024"), Some(date(2024, 1, 31)));
        assert_eq!(parse_date("31/13/2024"), None);
        assert_eq!(parse_date("yesterday"), None);
    }
}

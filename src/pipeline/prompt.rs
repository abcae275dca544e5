//! Prompt building: statement text → system + user messages.
//!
//! The builder refuses oversized documents with [`DocumentTooLargeError`]
//! instead of cutting them down. Dropping the tail of a statement would
//! silently drop transactions, and the totals would still look plausible.

use crate::error::DocumentTooLargeError;
use crate::prompts::{output_schema, statement_message, DEFAULT_TASK_PROMPT};
use once_cell::sync::Lazy;
use regex::Regex;

/// The instruction payload for one inference call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Task description followed by the output schema.
    pub system: String,
    /// The statement text wrapped in a short instruction.
    pub user: String,
    /// Characters of statement text carried in `user`.
    pub document_chars: usize,
}

/// Build the prompt for `document_text`.
///
/// `task` replaces [`DEFAULT_TASK_PROMPT`] when given. `max_chars` caps the
/// statement text, counted in characters.
pub fn build_prompt(
    document_text: &str,
    task: Option<&str>,
    max_chars: Option<usize>,
) -> Result<Prompt, DocumentTooLargeError> {
    let chars = document_text.chars().count();
    if let Some(limit) = max_chars {
        if chars > limit {
            return Err(DocumentTooLargeError { chars, limit });
        }
    }

    let mut system = task.unwrap_or(DEFAULT_TASK_PROMPT).trim_end().to_string();
    system.push_str(&output_schema());

    Ok(Prompt {
        system,
        user: statement_message(document_text),
        document_chars: chars,
    })
}

// ── Text preprocessing ───────────────────────────────────────────────────────
//
// Statement PDFs come out of text extraction with page furniture and the
// odd OCR confusion. Each rule is cheap and deterministic.

static RE_PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)page \d+ of \d+").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// `l` or `O` immediately before a digit, at the start of a token.
static RE_OCR_ONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bl(\d)").unwrap());
static RE_OCR_ZERO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bO(\d)").unwrap());

/// Clean extracted statement text before prompting.
///
/// Rules (applied in order):
/// 1. Remove `Page X of Y` markers
/// 2. Collapse whitespace runs to a single space
/// 3. `l` before a digit → `1`
/// 4. `O` before a digit → `0`
pub fn preprocess_text(input: &str) -> String {
    let s = RE_PAGE_MARKER.replace_all(input, "");
    let s = RE_WHITESPACE.replace_all(&s, " ");
    let s = RE_OCR_ONE.replace_all(&s, "1$1");
    let s = RE_OCR_ZERO.replace_all(&s, "0$1");
    s.trim().to_string()
}
